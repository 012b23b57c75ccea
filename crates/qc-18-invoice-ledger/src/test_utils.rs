use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

use crate::domain::entities::{Hash, Invoice, MilliSatoshi, Preimage};

pub fn test_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 3, 14, 9, 26, 53).unwrap()
}

pub fn random_preimage() -> Preimage {
    let mut preimage = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut preimage);
    preimage
}

pub fn hash_of(preimage: &Preimage) -> Hash {
    Sha256::digest(preimage).into()
}

/// Local-preimage invoice with random preimage and payment request.
pub fn random_invoice(value: u64) -> Invoice {
    let mut rng = rand::thread_rng();
    let mut invoice = Invoice::with_preimage(random_preimage(), MilliSatoshi(value), test_date());
    invoice.memo = b"memo".to_vec();
    invoice.payment_request = (0..rng.gen_range(16..64)).map(|_| rng.gen()).collect();
    invoice
}

/// External-preimage invoice for a random secret. Returns the secret too.
pub fn random_external_invoice(value: u64) -> (Invoice, Preimage) {
    let secret = random_preimage();
    let invoice = Invoice::with_external_hash(hash_of(&secret), MilliSatoshi(value), test_date());
    (invoice, secret)
}
