//! Analytics response body.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DailyViews, SnippetId};
use crate::service::SnippetAnalytics;

/// View totals of one snippet.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    /// Snippet id.
    pub snippet_id: SnippetId,
    /// Every recorded view.
    pub total_views: u64,
    /// Seven entries, oldest first, one per UTC date ending today.
    pub daily_views: Vec<DailyViews>,
}

impl From<SnippetAnalytics> for AnalyticsResponse {
    fn from(a: SnippetAnalytics) -> Self {
        Self {
            snippet_id: a.snippet_id,
            total_views: a.total_views,
            daily_views: a.daily_views,
        }
    }
}
