//! # snippet-service
//!
//! REST API for sharing code snippets. Users register, create snippets
//! with a language tag, a visibility level and an optional expiry, and
//! read each other's public snippets. Every detail view is written to an
//! access log that feeds per-snippet view analytics.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers + extractors (api/)
//!     │
//!     ├── SnippetService / UserService (service/)
//!     ├── ListingCache (cache)       TokenIssuer, PasswordHasher (auth/)
//!     │
//!     ├── Visibility & permission rules (domain/)
//!     │
//!     └── SnippetStore (persistence/): PostgreSQL or in-memory
//! ```

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod app_state;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;

/// Builds the full application: every route, HTTP tracing and CORS.
pub fn build_app(state: app_state::AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
