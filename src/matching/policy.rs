// src/matching/policy.rs - Maps a match score to an action
use serde::{Deserialize, Serialize};

use crate::config::MatchingConfig;

/// What to do with a scored pair. Ordered so that a higher score never maps
/// to a lower-confidence outcome (no-match < pending < auto-link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    NoMatch,
    Pending,
    AutoLink,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::NoMatch => "no_match",
            MatchOutcome::Pending => "pending",
            MatchOutcome::AutoLink => "auto_link",
        }
    }
}

/// Both thresholds are inclusive on their lower bound: exactly 90 auto-links,
/// exactly 70 queues for review.
pub fn classify_score(score: f64, config: &MatchingConfig) -> MatchOutcome {
    if score >= config.auto_link_threshold {
        MatchOutcome::AutoLink
    } else if score >= config.pending_threshold {
        MatchOutcome::Pending
    } else {
        MatchOutcome::NoMatch
    }
}
