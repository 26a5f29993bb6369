// src/sync/mod.rs
pub mod fetchers;
pub mod orchestrator;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::core::{SourceGym, SourceOrg};

/// Supplies one federation's gym records. The actual scraping/pagination
/// lives outside this crate; implementations here only deliver records and
/// guarantee `external_id` uniqueness within their org.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn org(&self) -> SourceOrg;
    async fn fetch_gyms(&self) -> Result<Vec<SourceGym>>;
}

pub use fetchers::JsonFeedFetcher;
pub use orchestrator::GymSyncOrchestrator;
