//! Salted password digests.

use sha2::{Digest as _, Sha256};

/// SHA-256 of `plaintext` followed by `salt`, as 64 lowercase hex digits.
///
/// The digest is one-way; the database compares digests at login.
pub fn hash_password(plaintext: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
