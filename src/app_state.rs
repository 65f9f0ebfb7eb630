//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::cache::ListingCache;
use crate::config::ServiceConfig;
use crate::persistence::SnippetStore;
use crate::service::{SnippetService, UserService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Snippet reads, writes, listings and analytics.
    pub snippet_service: Arc<SnippetService>,
    /// Registration, tokens and authentication.
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Wires the services over `store` according to `config`.
    #[must_use]
    pub fn new(config: &ServiceConfig, store: Arc<dyn SnippetStore>) -> Self {
        let cache = ListingCache::new(config.cache_ttl(), config.cache_max_capacity);
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl_minutes);
        Self {
            snippet_service: Arc::new(SnippetService::new(Arc::clone(&store), cache)),
            user_service: Arc::new(UserService::new(store, tokens, config.password_min_length)),
        }
    }
}
