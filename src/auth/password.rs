//! Password hashing and verification for usergate.
//!
//! Uses Argon2id for secure password hashing. Plaintext passwords only
//! live for the duration of a request; only the PHC hash string is stored.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand_core::OsRng;
use thiserror::Error;

use super::validation::password_meets_policy;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password does not satisfy the password policy.
    #[error("must be 8-72 characters long and contain at least one uppercase letter, one lowercase letter, one number, and one symbol")]
    Policy,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored password hash is corrupt.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// Memory cost in KiB (64 MiB).
pub const ARGON2_MEMORY_KIB: u32 = 65536;

/// Passes over memory.
pub const ARGON2_ITERATIONS: u32 = 3;

/// Lanes.
pub const ARGON2_LANES: u32 = 1;

/// Create the Argon2 hasher.
///
/// The cost is set so one hash takes a few hundred milliseconds on a
/// current server core, on par with bcrypt at cost 12.
fn create_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, None)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a password using Argon2id.
///
/// The password policy is checked first; a plaintext that fails it is never
/// hashed. Returns a PHC-formatted hash string that includes the salt and
/// parameters.
///
/// # Examples
///
/// ```
/// use usergate::hash_password;
///
/// let hash = hash_password("Abcdef1!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(hash_password("weak").is_err());
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if !password_meets_policy(password) {
        return Err(PasswordError::Policy);
    }

    let salt = SaltString::generate(&mut OsRng);

    let hash = create_argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a candidate password against a stored hash.
///
/// Returns `Ok(false)` for a well-formed hash that does not match and an
/// error only when the stored hash cannot be parsed.
///
/// # Examples
///
/// ```
/// use usergate::{hash_password, verify_password};
///
/// let hash = hash_password("Abcdef1!").unwrap();
/// assert!(verify_password("Abcdef1!", &hash).unwrap());
/// assert!(!verify_password("Abcdef2!", &hash).unwrap());
/// ```
pub fn verify_password(candidate: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    // Parameters come from the parsed hash, not from create_argon2()
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PasswordError::InvalidHash),
    }
}

/// Hash on the blocking pool so the async workers keep serving requests.
pub async fn hash_password_blocking(password: String) -> crate::Result<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| crate::UsergateError::Hashing(e.to_string()))??;
    Ok(hash)
}

/// Verify on the blocking pool. See [`verify_password`].
pub async fn verify_password_blocking(candidate: String, hash: String) -> crate::Result<bool> {
    let matched = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
        .await
        .map_err(|e| crate::UsergateError::Hashing(e.to_string()))??;
    Ok(matched)
}
