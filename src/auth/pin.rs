//! PIN hashing and verification.
//!
//! Stored hashes are either bcrypt (`$2a$`, `$2b$`, `$2y$`), which is what the
//! existing deployments were provisioned with, or Argon2 PHC strings, which is
//! what [`hash_pin`] produces for new installs. Verification never reports
//! *why* it failed: a malformed hash and a wrong PIN both return `false`.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];
const ARGON2_PREFIXES: [&str; 3] = ["$argon2id$", "$argon2i$", "$argon2d$"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HashFamily {
    Bcrypt,
    Argon2,
}

fn hash_family(stored_hash: &str) -> Option<HashFamily> {
    if BCRYPT_PREFIXES.iter().any(|p| stored_hash.starts_with(p)) {
        Some(HashFamily::Bcrypt)
    } else if ARGON2_PREFIXES.iter().any(|p| stored_hash.starts_with(p)) {
        Some(HashFamily::Argon2)
    } else {
        None
    }
}

/// Whether `stored_hash` looks like a hash this module can verify.
#[must_use]
pub fn is_supported_hash(stored_hash: &str) -> bool {
    hash_family(stored_hash.trim()).is_some()
}

/// Check `candidate` against `stored_hash` using the hash's own slow KDF.
#[must_use]
pub fn verify_pin(candidate: &str, stored_hash: &str) -> bool {
    let stored_hash = stored_hash.trim();
    match hash_family(stored_hash) {
        Some(HashFamily::Bcrypt) => bcrypt::verify(candidate, stored_hash).unwrap_or(false),
        Some(HashFamily::Argon2) => PasswordHash::new(stored_hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok()
        }),
        None => false,
    }
}

/// Hash a PIN with Argon2id and a random salt, returning the PHC string.
///
/// # Errors
/// Returns an error if the PIN is empty or hashing fails.
pub fn hash_pin(pin: &str) -> Result<String> {
    if pin.is_empty() {
        return Err(anyhow!("PIN must not be empty"));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash PIN: {err}"))
}
