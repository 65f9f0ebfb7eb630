//! Per-snippet view analytics.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::AnalyticsResponse;
use crate::api::extractors::{PathParam, Viewer};
use crate::app_state::AppState;
use crate::domain::SnippetId;
use crate::error::{ErrorResponse, ServiceError};

/// `GET /snippets/{id}/analytics`: Total and daily views.
///
/// # Errors
///
/// Returns [`ServiceError::SnippetNotFound`] or [`ServiceError::Forbidden`]
/// when the caller may not see the figures.
#[utoipa::path(
    get,
    path = "/api/v1/snippets/{id}/analytics",
    tag = "Analytics",
    summary = "Snippet view analytics",
    description = "Total views plus a zero-filled histogram of the last seven UTC days. Available to the owner, or to anyone for public snippets.",
    params(
        ("id" = uuid::Uuid, Path, description = "Snippet UUID"),
    ),
    responses(
        (status = 200, description = "View analytics", body = AnalyticsResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 404, description = "Snippet not found", body = ErrorResponse),
    )
)]
pub async fn snippet_analytics(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let analytics = state
        .snippet_service
        .analytics(SnippetId::from_uuid(id), viewer)
        .await?;
    Ok(Json(AnalyticsResponse::from(analytics)))
}

/// Analytics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/snippets/{id}/analytics", get(snippet_analytics))
}
