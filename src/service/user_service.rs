//! Account registration and token issuance.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{IssuedToken, PasswordHasher, TokenIssuer};
use crate::domain::user::is_valid_username;
use crate::domain::{User, UserId};
use crate::error::ServiceError;
use crate::persistence::SnippetStore;

/// Registers users and exchanges credentials for bearer tokens.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn SnippetStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    password_min_length: usize,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(store: Arc<dyn SnippetStore>, tokens: TokenIssuer, password_min_length: usize) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            tokens,
            password_min_length,
        }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for a malformed or taken
    /// username or a short password.
    pub async fn register(
        &self,
        username: &str,
        email: Option<String>,
        password: &str,
    ) -> Result<User, ServiceError> {
        if !is_valid_username(username) {
            return Err(ServiceError::field(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            ));
        }
        if password.chars().count() < self.password_min_length {
            return Err(ServiceError::field(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    self.password_min_length
                ),
            ));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            email,
            password_hash: self.hasher.hash_blocking(password.to_string()).await?,
            created_at: Utc::now(),
        };
        self.store.create_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Verifies credentials and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidCredentials`] when the username is
    /// unknown or the password does not match.
    pub async fn issue_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, ServiceError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;
        let matches = self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;
        if !matches {
            return Err(ServiceError::InvalidCredentials);
        }
        self.tokens.issue(&user)
    }

    /// Resolves a bearer token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] if the token is invalid or
    /// its user no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<UserId, ServiceError> {
        let claims = self.tokens.verify(token)?;
        let user_id = claims.user_id();
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(user_id),
            None => Err(ServiceError::Unauthorized("user no longer exists".to_string())),
        }
    }
}
