//! System endpoints: health check and the language catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Language;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when the store answers, `degraded` otherwise.
    pub status: String,
    /// Server time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Detail views served without an access-log row since startup.
    pub access_log_failures: u64,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, current timestamp and the number of access-log write failures. Responds 503 when the store is unreachable.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label) = match state.snippet_service.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };
    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            access_log_failures: state.snippet_service.access_log_failures(),
        }),
    )
}

/// Supported language info.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LanguageInfo {
    /// Tag accepted in `language` fields and filters.
    pub language: String,
    /// Display name.
    pub label: String,
}

/// `GET /config/languages`: List supported language tags.
#[utoipa::path(
    get,
    path = "/config/languages",
    tag = "System",
    summary = "List supported languages",
    description = "Returns every language tag a snippet may carry.",
    responses(
        (status = 200, description = "Language catalog", body = Vec<LanguageInfo>),
    )
)]
pub async fn languages_handler() -> impl IntoResponse {
    let languages: Vec<LanguageInfo> = Language::ALL
        .iter()
        .map(|l| LanguageInfo {
            language: l.as_str().to_string(),
            label: l.label().to_string(),
        })
        .collect();
    (StatusCode::OK, Json(languages))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/languages", get(languages_handler))
}
