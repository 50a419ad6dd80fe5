//! PIN hashing with Argon2id.
//!
//! Hashes are stored as PHC strings. Cost parameters are fixed so every
//! stored hash is produced the same way; verification reads the parameters
//! back from the stored string.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, Version,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Memory cost in KiB (64 MiB).
pub const PIN_MEMORY_KIB: u32 = 64 * 1024;
/// Number of passes.
pub const PIN_TIME_COST: u32 = 1;
/// Degree of parallelism.
pub const PIN_LANES: u32 = 4;
/// Derived key length in bytes.
pub const PIN_OUTPUT_LEN: usize = 32;

/// Errors that can occur during PIN operations.
#[derive(Debug, Error)]
pub enum PinError {
    /// PIN is not 4 to 8 ASCII digits.
    #[error("PIN must be 4 to 8 digits")]
    InvalidPin,

    /// Failed to hash PIN.
    #[error("failed to hash PIN: {0}")]
    HashError(String),

    /// Failed to verify PIN.
    #[error("failed to verify PIN: {0}")]
    VerifyError(String),

    /// Stored hash is not a well-formed Argon2id PHC string.
    #[error("invalid PIN hash format")]
    InvalidHash,
}

fn hasher() -> Result<Argon2<'static>, PinError> {
    let params = Params::new(PIN_MEMORY_KIB, PIN_TIME_COST, PIN_LANES, Some(PIN_OUTPUT_LEN))
        .map_err(|e| PinError::HashError(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Checks that a PIN is 4 to 8 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), PinError> {
    if (4..=8).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PinError::InvalidPin)
    }
}

/// Hashes a PIN using Argon2id with a random 16-byte salt.
///
/// # Errors
///
/// Returns `PinError::InvalidPin` if the PIN is malformed, or
/// `PinError::HashError` if hashing fails.
///
/// # Example
///
/// ```
/// use paystore_core::auth::hash_pin;
///
/// let hash = hash_pin("1234").unwrap();
/// assert!(hash.starts_with("$argon2id$v=19$m=65536,t=1,p=4$"));
/// ```
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    validate_pin(pin)?;
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PinError::HashError(e.to_string()))
}

/// Verifies a candidate PIN against a stored hash.
///
/// The comparison of derived keys is constant-time.
///
/// # Errors
///
/// Returns `PinError::InvalidHash` if the stored hash cannot be parsed or is
/// not Argon2id.
///
/// # Example
///
/// ```
/// use paystore_core::auth::{hash_pin, verify_pin};
///
/// let hash = hash_pin("1234").unwrap();
/// assert!(verify_pin("1234", &hash).unwrap());
/// assert!(!verify_pin("0000", &hash).unwrap());
/// ```
pub fn verify_pin(candidate: &str, stored: &str) -> Result<bool, PinError> {
    let parsed = PasswordHash::new(stored).map_err(|_| PinError::InvalidHash)?;
    if parsed.algorithm != Algorithm::Argon2id.ident()
        || parsed.salt.is_none()
        || parsed.hash.is_none()
    {
        return Err(PinError::InvalidHash);
    }

    match hasher()?.verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(
            argon2::password_hash::Error::Algorithm
            | argon2::password_hash::Error::ParamNameInvalid
            | argon2::password_hash::Error::ParamValueInvalid(_)
            | argon2::password_hash::Error::OutputSize { .. }
            | argon2::password_hash::Error::SaltInvalid(_)
            | argon2::password_hash::Error::Version,
        ) => Err(PinError::InvalidHash),
        Err(e) => Err(PinError::VerifyError(e.to_string())),
    }
}
