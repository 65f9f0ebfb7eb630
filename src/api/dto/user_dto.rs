//! Registration and token request/response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Login name: letters, digits and `@.+-_`, at most 150 characters.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,
    /// Optional contact address. Blank counts as absent.
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    /// Plaintext password.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Body of `POST /auth/token`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TokenRequest {
    /// Login name.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,
    /// Plaintext password.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Signed JWT to send as `Authorization: Bearer <token>`.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Expiry of the token.
    pub expires_at: DateTime<Utc>,
}
