//! Salted SHA-512 password digests.
//!
//! Each user carries its own random salt. The stored digest is the hex encoding
//! of `SHA-512(password || salt)`.

use rand::RngCore;
use sha2::{Digest, Sha512};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Generate a fresh random salt, hex encoded for storage.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Hash a password with the given hex-encoded salt.
///
/// A salt that is not valid hex is mixed in as raw bytes so that hashing
/// stays a total function; `matches` applies the same rule.
pub fn hash_password(password: &str, salt: &str) -> String {
    let salt_bytes = hex::decode(salt).unwrap_or_else(|_| salt.as_bytes().to_vec());

    let mut hasher = Sha512::new();
    hasher.update(password.as_bytes());
    hasher.update(&salt_bytes);
    hex::encode(hasher.finalize())
}

/// Check a candidate password against a stored digest.
/// A mismatch is `false`, never an error.
pub fn matches(stored_digest: &str, candidate: &str, salt: &str) -> bool {
    let computed = hash_password(candidate, salt);
    constant_time_eq(stored_digest.as_bytes(), computed.as_bytes())
}

/// Fixed salt hashed against when the account does not exist.
const DUMMY_SALT: &str = "00000000000000000000000000000000";

/// Spend the same hashing work as [`matches`] for a user that does not exist,
/// so an unknown username answers no faster than a wrong password.
/// Always `false`.
pub fn dummy_verify(candidate: &str) -> bool {
    matches("", candidate, DUMMY_SALT)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
