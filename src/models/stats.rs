// src/models/stats.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::core::SourceOrg;

/// Outcome counts for one federation's sync run. A fetch failure is recorded
/// in `error` and leaves the counts at their defaults; it never aborts the
/// other source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSyncStats {
    pub org: SourceOrg,
    pub fetched: usize,
    pub saved: usize,
    pub skipped_linked: usize,
    pub auto_linked: usize,
    pub pending_review: usize,
    pub masters_created: usize,
    pub individual_operation_errors: usize,
    pub duration_secs: f64,
    pub error: Option<String>,
}

impl SourceSyncStats {
    pub fn new(org: SourceOrg) -> Self {
        Self {
            org,
            fetched: 0,
            saved: 0,
            skipped_linked: 0,
            auto_linked: 0,
            pending_review: 0,
            masters_created: 0,
            individual_operation_errors: 0,
            duration_secs: 0.0,
            error: None,
        }
    }
}

/// Aggregate report for a full sync run across all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunStats {
    pub run_id: String,
    pub run_timestamp: DateTime<Utc>,
    pub per_source: Vec<SourceSyncStats>,
    pub total_duration_secs: f64,
}

impl SyncRunStats {
    pub fn total_fetched(&self) -> usize {
        self.per_source.iter().map(|s| s.fetched).sum()
    }

    pub fn total_auto_linked(&self) -> usize {
        self.per_source.iter().map(|s| s.auto_linked).sum()
    }

    pub fn total_pending_review(&self) -> usize {
        self.per_source.iter().map(|s| s.pending_review).sum()
    }

    pub fn total_masters_created(&self) -> usize {
        self.per_source.iter().map(|s| s.masters_created).sum()
    }

    pub fn failed_sources(&self) -> Vec<&SourceSyncStats> {
        self.per_source.iter().filter(|s| s.error.is_some()).collect()
    }
}
