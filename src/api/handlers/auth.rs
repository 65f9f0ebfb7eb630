//! Registration and token endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{MessageResponse, RegisterRequest, TokenRequest, TokenResponse};
use crate::api::extractors::ValidatedJson;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};

/// `POST /auth/register`: Create an account.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] for invalid or taken usernames
/// and weak passwords.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    summary = "Register a user",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .user_service
        .register(&req.username, req.email, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// `POST /auth/token`: Exchange credentials for a bearer token.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidCredentials`] on a bad username or
/// password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "Auth",
    summary = "Obtain an access token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TokenRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let issued = state
        .user_service
        .issue_token(&req.username, &req.password)
        .await?;
    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    }))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(issue_token))
}
