use std::sync::Arc;

use crate::cache::ScoreCache;
use crate::config::Config;
use crate::listing::ListingMerger;
use crate::scoring::background::BackgroundScorer;
use crate::scoring::client::ScoreClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Resilient scoring client with the tiered fallback chain.
    pub scorer: Arc<ScoreClient>,
    /// Persistent (user, job) score cache.
    pub cache: Arc<dyn ScoreCache>,
    /// Fire-and-forget corpus recomputes on resume change.
    pub background: BackgroundScorer,
    /// Read-time merge of cached scores into listing pages.
    pub listings: Arc<ListingMerger>,
}
