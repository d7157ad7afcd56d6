//! Password hashing for the login flow. SHA-256 of the password salted with
//! the canonical (lowercased) player name, hex-encoded. Good enough for a
//! reference implementation; a production deployment should swap this for
//! a slow hash (argon2/bcrypt) behind the same function signature.

use sha2::{Digest, Sha256};

pub fn hash_password(canonical_name: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_name.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(canonical_name: &str, password: &str, stored_hash: &str) -> bool {
    hash_password(canonical_name, password) == stored_hash
}
