//! Argon2id password hashing shared by account storage and login.
//!
//! New hashes use m=19456 KiB, t=2, p=1. Verification reads the parameters
//! stored in the PHC string, so hashes made with other settings still
//! verify. A server-side pepper, when configured, is prepended to the
//! plaintext on both paths.

use std::borrow::Cow;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use thiserror::Error;

use crate::error::CrmError;

const MEMORY_KIB: u32 = 19_456;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 parameters rejected: {0}")]
    Params(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<PasswordError> for CrmError {
    fn from(err: PasswordError) -> Self {
        CrmError::Internal(err.to_string())
    }
}

/// Hashes and verifies passwords under one optional pepper.
#[derive(Clone, Default)]
pub struct Passwords {
    pepper: Option<String>,
}

impl std::fmt::Debug for Passwords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passwords")
            .field("peppered", &self.pepper.is_some())
            .finish()
    }
}

impl Passwords {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    /// PHC-format Argon2id hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2()?
            .hash_password(self.input(password).as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch. Only a malformed stored hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        match argon2()?.verify_password(self.input(password).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }

    fn input<'a>(&self, password: &'a str) -> Cow<'a, str> {
        match &self.pepper {
            Some(pepper) => Cow::Owned(format!("{pepper}{password}")),
            None => Cow::Borrowed(password),
        }
    }
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| PasswordError::Params(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}
