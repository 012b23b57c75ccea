//! # Invoice Record Codec
//!
//! Flat, order-sensitive binary layout for one stored invoice:
//!
//! ```text
//! varlen(memo) | varlen(receipt) | varlen(payment_request)
//! varlen(creation_date) | varlen(settle_date)
//! preimage[32] | payment_hash[32] (zeros unless external)
//! value u64 BE | settled u8 | add_index u64 BE | settle_index u64 BE
//! amt_paid i64 BE | external_preimage u8
//! ```
//!
//! `varlen` is a CompactSize var-int length followed by the bytes. A timestamp
//! blob is empty for "unset", otherwise `version(1) | secs i64 BE | nanos u32 BE`.
//!
//! Decoding applies the same ceilings as encoding and never returns a
//! partially populated invoice.

use chrono::{DateTime, Utc};

use super::entities::{Hash, Invoice, MilliSatoshi, ZERO_HASH};
use super::errors::CodecError;
use super::validation::limits;

/// Current timestamp blob version.
const TIMESTAMP_VERSION: u8 = 1;

/// Encoded length of a set timestamp.
const TIMESTAMP_LEN: usize = 1 + 8 + 4;

/// Serialize an invoice.
pub fn encode_invoice(invoice: &Invoice) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(
        128 + invoice.memo.len() + invoice.receipt.len() + invoice.payment_request.len(),
    );

    write_var_bytes(&mut buf, "memo", &invoice.memo, limits::MAX_MEMO_SIZE)?;
    write_var_bytes(&mut buf, "receipt", &invoice.receipt, limits::MAX_RECEIPT_SIZE)?;
    write_var_bytes(
        &mut buf,
        "payment_request",
        &invoice.payment_request,
        limits::MAX_PAYMENT_REQUEST_SIZE,
    )?;

    let creation = encode_timestamp(Some(&invoice.creation_date));
    write_var_bytes(&mut buf, "creation_date", &creation, limits::MAX_TIMESTAMP_SIZE)?;
    let settle = encode_timestamp(invoice.settle_date.as_ref());
    write_var_bytes(&mut buf, "settle_date", &settle, limits::MAX_TIMESTAMP_SIZE)?;

    buf.extend_from_slice(&invoice.terms.payment_preimage);

    // The hash of a local invoice is always derived, so it is not persisted.
    if invoice.terms.external_preimage {
        buf.extend_from_slice(&invoice.terms.payment_hash);
    } else {
        buf.extend_from_slice(&ZERO_HASH);
    }

    buf.extend_from_slice(&invoice.terms.value.0.to_be_bytes());
    buf.push(invoice.terms.settled as u8);
    buf.extend_from_slice(&invoice.add_index.to_be_bytes());
    buf.extend_from_slice(&invoice.settle_index.to_be_bytes());
    buf.extend_from_slice(&(invoice.amt_paid.0 as i64).to_be_bytes());
    buf.push(invoice.terms.external_preimage as u8);

    Ok(buf)
}

/// Deserialize an invoice.
pub fn decode_invoice(data: &[u8]) -> Result<Invoice, CodecError> {
    let mut r = Reader::new(data);

    let memo = r.read_var_bytes("memo", limits::MAX_MEMO_SIZE)?;
    let receipt = r.read_var_bytes("receipt", limits::MAX_RECEIPT_SIZE)?;
    let payment_request = r.read_var_bytes("payment_request", limits::MAX_PAYMENT_REQUEST_SIZE)?;

    let creation = r.read_var_bytes("creation_date", limits::MAX_TIMESTAMP_SIZE)?;
    let creation_date =
        decode_timestamp("creation_date", &creation)?.ok_or(CodecError::InvalidTimestamp {
            field: "creation_date",
            reason: "missing",
        })?;
    let settle = r.read_var_bytes("settle_date", limits::MAX_TIMESTAMP_SIZE)?;
    let settle_date = decode_timestamp("settle_date", &settle)?;

    let payment_preimage = r.read_array::<32>("payment_preimage")?;
    let stored_hash: Hash = r.read_array::<32>("payment_hash")?;
    let value = MilliSatoshi(r.read_u64("value")?);
    let settled = r.read_bool("settled")?;
    let add_index = r.read_u64("add_index")?;
    let settle_index = r.read_u64("settle_index")?;
    let amt_paid = MilliSatoshi(r.read_i64("amt_paid")? as u64);
    let external_preimage = r.read_bool("external_preimage")?;
    r.finish()?;

    let mut invoice = Invoice {
        memo,
        receipt,
        payment_request,
        creation_date,
        settle_date,
        add_index,
        settle_index,
        amt_paid,
        ..Invoice::default()
    };
    invoice.terms.external_preimage = external_preimage;
    invoice.terms.payment_preimage = payment_preimage;
    invoice.terms.value = value;
    invoice.terms.settled = settled;
    invoice.terms.payment_hash = if external_preimage {
        stored_hash
    } else {
        ZERO_HASH
    };

    Ok(invoice)
}

fn encode_timestamp(ts: Option<&DateTime<Utc>>) -> Vec<u8> {
    let Some(ts) = ts else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(TIMESTAMP_LEN);
    out.push(TIMESTAMP_VERSION);
    out.extend_from_slice(&ts.timestamp().to_be_bytes());
    out.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
    out
}

fn decode_timestamp(
    field: &'static str,
    blob: &[u8],
) -> Result<Option<DateTime<Utc>>, CodecError> {
    if blob.is_empty() {
        return Ok(None);
    }
    if blob.len() != TIMESTAMP_LEN {
        return Err(CodecError::InvalidTimestamp {
            field,
            reason: "unexpected length",
        });
    }
    if blob[0] != TIMESTAMP_VERSION {
        return Err(CodecError::InvalidTimestamp {
            field,
            reason: "unsupported version",
        });
    }

    let mut r = Reader::new(&blob[1..]);
    let secs = r.read_i64(field)?;
    let nanos = r.read_u32(field)?;
    DateTime::from_timestamp(secs, nanos)
        .map(Some)
        .ok_or(CodecError::InvalidTimestamp {
            field,
            reason: "out of range",
        })
}

/// Append a CompactSize var-int.
fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(
    buf: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
    max: usize,
) -> Result<(), CodecError> {
    if bytes.len() > max {
        return Err(CodecError::FieldTooLarge {
            field,
            len: bytes.len() as u64,
            max,
        });
    }
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over an encoded record.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(field, 1)?[0])
    }

    fn read_bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.read_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidBool { field, value }),
        }
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array(field)?))
    }

    fn read_u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array(field)?))
    }

    fn read_i64(&mut self, field: &'static str) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.read_array(field)?))
    }

    fn read_varint(&mut self, field: &'static str) -> Result<u64, CodecError> {
        let (value, min) = match self.read_u8(field)? {
            0xfd => (
                u16::from_le_bytes(self.read_array(field)?) as u64,
                0xfd,
            ),
            0xfe => (
                u32::from_le_bytes(self.read_array(field)?) as u64,
                0x1_0000,
            ),
            0xff => (u64::from_le_bytes(self.read_array(field)?), 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < min {
            return Err(CodecError::NonCanonicalVarInt { field });
        }
        Ok(value)
    }

    fn read_var_bytes(&mut self, field: &'static str, max: usize) -> Result<Vec<u8>, CodecError> {
        let len = self.read_varint(field)?;
        if len > max as u64 {
            return Err(CodecError::FieldTooLarge { field, len, max });
        }
        Ok(self.take(field, len as usize)?.to_vec())
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(CodecError::TrailingBytes { count }),
        }
    }
}
