//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::ServiceError;

/// Hashes and verifies user passwords with Argon2id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hashes a plaintext password with a random salt.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
    }

    /// Checks a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the stored hash is malformed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::Internal(format!("invalid password hash: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(ServiceError::Internal(format!(
                "password verification failed: {e}"
            ))),
        }
    }

    /// Runs [`PasswordHasher::hash`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if hashing fails or the task
    /// panics.
    pub async fn hash_blocking(self, password: String) -> Result<String, ServiceError> {
        tokio::task::spawn_blocking(move || self.hash(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {e}")))?
    }

    /// Runs [`PasswordHasher::verify`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the stored hash is malformed
    /// or the task panics.
    pub async fn verify_blocking(self, password: String, hash: String) -> Result<bool, ServiceError> {
        tokio::task::spawn_blocking(move || self.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("password verification task failed: {e}")))?
    }
}
