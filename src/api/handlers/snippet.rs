//! Snippet CRUD, listing and search handlers.

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    CreateSnippetRequest, ListParams, PatchSnippetRequest, SearchParams, SnippetListResponse,
    SnippetResponse,
};
use crate::api::extractors::{AuthUser, Client, PathParam, QueryParams, ValidatedJson, Viewer};
use crate::app_state::AppState;
use crate::domain::SnippetId;
use crate::error::{ErrorResponse, ServiceError};

/// Header set on detail views whose access-log write failed.
pub const ACCESS_LOG_HEADER: &str = "x-access-log";

/// `GET /snippets`: List visible snippets.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid filters or store failures.
#[utoipa::path(
    get,
    path = "/api/v1/snippets",
    tag = "Snippets",
    summary = "List snippets",
    description = "Anonymous callers see live public snippets; authenticated callers also see their own. Results are cached for five minutes.",
    params(ListParams),
    responses(
        (status = 200, description = "Paginated previews", body = SnippetListResponse),
        (status = 400, description = "Invalid filter or ordering", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn list_snippets(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.to_query(viewer)?;
    let pagination = params.pagination();
    let page = state
        .snippet_service
        .list(&query, pagination.clamped())
        .await?;
    Ok(Json(SnippetListResponse::from_page(
        &page,
        pagination,
        Utc::now(),
    )))
}

/// `GET /snippets/search`: Free-text search over visible snippets.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid filters or store failures.
#[utoipa::path(
    get,
    path = "/api/v1/snippets/search",
    tag = "Snippets",
    summary = "Search snippets",
    description = "Matches `q` case-insensitively against title, content and language, with the same visibility rule as the list endpoint.",
    params(SearchParams),
    responses(
        (status = 200, description = "Paginated previews", body = SnippetListResponse),
        (status = 400, description = "Invalid filter or ordering", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn search_snippets(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.to_query(viewer)?;
    let pagination = params.pagination();
    let page = state
        .snippet_service
        .search(&query, pagination.clamped())
        .await?;
    Ok(Json(SnippetListResponse::from_page(
        &page,
        pagination,
        Utc::now(),
    )))
}

/// `POST /snippets`: Create a snippet owned by the caller.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input or missing credentials.
#[utoipa::path(
    post,
    path = "/api/v1/snippets",
    tag = "Snippets",
    summary = "Create a snippet",
    request_body = CreateSnippetRequest,
    responses(
        (status = 201, description = "Snippet created", body = SnippetResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_snippet(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateSnippetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.snippet_service.create(owner, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SnippetResponse::from_record(&record, Utc::now())),
    ))
}

/// `GET /snippets/{id}`: Snippet detail. Every successful call is
/// recorded in the access log.
///
/// # Errors
///
/// Returns [`ServiceError::SnippetNotFound`] if the snippet is not
/// visible to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/snippets/{id}",
    tag = "Snippets",
    summary = "Get a snippet",
    description = "Returns the full snippet and records the view. When the view cannot be recorded the response carries `x-access-log: failed`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Snippet UUID"),
    ),
    responses(
        (status = 200, description = "Snippet detail", body = SnippetResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 404, description = "Snippet not found", body = ErrorResponse),
    )
)]
pub async fn get_snippet(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Client(client): Client,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<Response, ServiceError> {
    let view = state
        .snippet_service
        .get(SnippetId::from_uuid(id), viewer, &client)
        .await?;
    let mut response = Json(SnippetResponse::from_record(&view.record, Utc::now())).into_response();
    if view.access_log.is_failed() {
        response
            .headers_mut()
            .insert(ACCESS_LOG_HEADER, HeaderValue::from_static("failed"));
    }
    Ok(response)
}

/// `PUT /snippets/{id}`: Replace every writable field.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input, missing credentials, or
/// when the caller is not the owner.
#[utoipa::path(
    put,
    path = "/api/v1/snippets/{id}",
    tag = "Snippets",
    summary = "Replace a snippet",
    params(
        ("id" = uuid::Uuid, Path, description = "Snippet UUID"),
    ),
    request_body = CreateSnippetRequest,
    responses(
        (status = 200, description = "Snippet replaced", body = SnippetResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Snippet not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn replace_snippet(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathParam(id): PathParam<uuid::Uuid>,
    ValidatedJson(req): ValidatedJson<CreateSnippetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .snippet_service
        .replace(SnippetId::from_uuid(id), requester, req.into())
        .await?;
    Ok(Json(SnippetResponse::from_record(&record, Utc::now())))
}

/// `PATCH /snippets/{id}`: Update the supplied fields only.
///
/// # Errors
///
/// Same as [`replace_snippet`].
#[utoipa::path(
    patch,
    path = "/api/v1/snippets/{id}",
    tag = "Snippets",
    summary = "Update a snippet",
    params(
        ("id" = uuid::Uuid, Path, description = "Snippet UUID"),
    ),
    request_body = PatchSnippetRequest,
    responses(
        (status = 200, description = "Snippet updated", body = SnippetResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Snippet not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn patch_snippet(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathParam(id): PathParam<uuid::Uuid>,
    ValidatedJson(req): ValidatedJson<PatchSnippetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .snippet_service
        .patch(SnippetId::from_uuid(id), requester, req.into())
        .await?;
    Ok(Json(SnippetResponse::from_record(&record, Utc::now())))
}

/// `DELETE /snippets/{id}`: Delete a snippet and its access logs.
///
/// # Errors
///
/// Returns [`ServiceError`] on missing credentials or when the caller is
/// not the owner.
#[utoipa::path(
    delete,
    path = "/api/v1/snippets/{id}",
    tag = "Snippets",
    summary = "Delete a snippet",
    params(
        ("id" = uuid::Uuid, Path, description = "Snippet UUID"),
    ),
    responses(
        (status = 204, description = "Snippet deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Snippet not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn delete_snippet(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathParam(id): PathParam<uuid::Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .snippet_service
        .delete(SnippetId::from_uuid(id), requester)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Snippet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/snippets", get(list_snippets).post(create_snippet))
        .route("/snippets/search", get(search_snippets))
        .route(
            "/snippets/{id}",
            get(get_snippet)
                .put(replace_snippet)
                .patch(patch_snippet)
                .delete(delete_snippet),
        )
}
