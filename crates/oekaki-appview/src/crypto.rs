//! Hashes published alongside pictures or checked on delete.

use pbkdf2::pbkdf2_hmac_array;
use sha2::{Digest, Sha256};

const SIGNATURE_SALT: &[u8] = b"ioioioioioioio";
const SIGNATURE_ROUNDS: u32 = 1024;

/// Public fingerprint of an author name (hex SHA-256)
pub fn author_hash(author: &str) -> String {
    hex::encode(Sha256::digest(author.as_bytes()))
}

/// Stored form of a delete signature (hex PBKDF2-HMAC-SHA256)
pub fn signature_hash(signature: &str) -> String {
    let key = pbkdf2_hmac_array::<Sha256, 32>(signature.as_bytes(), SIGNATURE_SALT, SIGNATURE_ROUNDS);
    hex::encode(key)
}
