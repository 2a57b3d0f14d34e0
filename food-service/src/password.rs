//! Password hashing using Argon2id
//!
//! User passwords are hashed before they reach storage and are never read
//! back through the services.
//!
//! # Example
//!
//! ```rust
//! use food_service::config::PasswordConfig;
//! use food_service::password::PasswordHasher;
//!
//! let hasher = PasswordHasher::new(&PasswordConfig {
//!     memory_cost_kib: 64,
//!     time_cost: 1,
//!     parallelism: 1,
//!     min_password_length: 8,
//! })
//! .unwrap();
//!
//! let hash = hasher.hash("correct horse").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(hasher.verify("correct horse", &hash).unwrap());
//! ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

use crate::config::PasswordConfig;

/// Password hashing failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters")]
    TooShort(usize),

    #[error("Invalid password hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

/// Argon2id hasher with configured cost parameters
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    min_password_length: usize,
}

impl Default for PasswordHasher {
    /// The Argon2 crate's default cost and an eight character minimum
    fn default() -> Self {
        Self {
            params: Params::default(),
            min_password_length: PasswordConfig::default().min_password_length,
        }
    }
}

impl PasswordHasher {
    /// Hasher with the configured cost parameters
    ///
    /// # Errors
    ///
    /// `InvalidParams` when Argon2 rejects the cost parameters.
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            params,
            min_password_length: config.min_password_length,
        })
    }

    /// Hash a password into a PHC string
    ///
    /// # Errors
    ///
    /// `TooShort` below the minimum length, `Hashing` on a cryptographic failure.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.chars().count() < self.min_password_length {
            return Err(PasswordError::TooShort(self.min_password_length));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Check a password against a PHC string; parameters are read from the hash
    ///
    /// # Errors
    ///
    /// `InvalidHash` when `hash` is not a PHC string.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hashing(e.to_string())),
        }
    }
}
