//! Private-partition PIN rules and Argon2id hashing.

use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{ApiResult, AppError};

pub use argon2::Params;

pub const MIN_PIN_LEN: usize = 4;
pub const MAX_PIN_LEN: usize = 10;

/// Checks a newly chosen PIN and its confirmation. Length is counted in
/// characters.
pub fn validate_new_pin(pin: &str, confirm: &str) -> ApiResult<()> {
    let len = pin.chars().count();
    if !(MIN_PIN_LEN..=MAX_PIN_LEN).contains(&len) {
        return Err(AppError::validation(format!(
            "pin must be {MIN_PIN_LEN} to {MAX_PIN_LEN} characters"
        )));
    }
    if pin != confirm {
        return Err(AppError::validation("pin and confirmation do not match"));
    }
    Ok(())
}

/// Salted Argon2id hashing producing PHC strings.
#[derive(Clone)]
pub struct PinHasher {
    argon2: Argon2<'static>,
}

impl Default for PinHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PinHasher {
    /// Hasher with explicit cost parameters. Tests use this with tiny costs.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn hash(&self, pin: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash pin: {}", e))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is corrupt.
    pub fn verify(&self, pin: &str, stored: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("Invalid pin hash: {}", e))?;
        Ok(self.argon2.verify_password(pin.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PinHasher {
    PinHasher::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap())
}
