// src/models/matching.rs
use serde::{Deserialize, Serialize};

use super::core::SourceGym;

/// Snapshot of how a pair scored, kept alongside the score so a reviewer can
/// see what the comparison actually looked at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchValues {
    pub normalized_name_1: String,
    pub normalized_name_2: String,
    pub base_score: f64,
    pub city_boost: f64,
}

/// One scored candidate from the matching pool, ordered best-first by the
/// matching service.
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub gym: SourceGym,
    pub score: f64,
    pub values: MatchValues,
}
