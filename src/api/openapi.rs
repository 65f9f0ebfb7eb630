//! OpenAPI document assembled from the handler annotations.

use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

use super::dto;
use super::handlers::{analytics, auth, snippet, system};
use crate::domain::{DailyViews, Language, SnippetId, Visibility};
use crate::error::{ErrorBody, ErrorResponse};

/// Registers the `bearer` JWT scheme referenced by protected operations.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Complete API description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "snippet-service", description = "Code snippet sharing API"),
    paths(
        snippet::list_snippets,
        snippet::search_snippets,
        snippet::create_snippet,
        snippet::get_snippet,
        snippet::replace_snippet,
        snippet::patch_snippet,
        snippet::delete_snippet,
        analytics::snippet_analytics,
        auth::register,
        auth::issue_token,
        system::health_handler,
        system::languages_handler,
    ),
    components(schemas(
        SnippetId,
        Language,
        Visibility,
        DailyViews,
        ErrorResponse,
        ErrorBody,
        dto::CreateSnippetRequest,
        dto::PatchSnippetRequest,
        dto::SnippetResponse,
        dto::SnippetPreview,
        dto::SnippetListResponse,
        dto::PaginationMeta,
        dto::AnalyticsResponse,
        dto::RegisterRequest,
        dto::TokenRequest,
        dto::TokenResponse,
        dto::MessageResponse,
        system::HealthResponse,
        system::LanguageInfo,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Snippets", description = "Snippet CRUD, listing and search"),
        (name = "Analytics", description = "Per-snippet view analytics"),
        (name = "Auth", description = "Registration and tokens"),
        (name = "System", description = "Health and catalogs"),
    )
)]
pub struct ApiDoc;
