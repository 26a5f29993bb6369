// src/models/core.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Federation that published a source gym record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrg {
    Ibjjf,
    Jjwl,
}

impl SourceOrg {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOrg::Ibjjf => "ibjjf",
            SourceOrg::Jjwl => "jjwl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ibjjf" => Some(SourceOrg::Ibjjf),
            "jjwl" => Some(SourceOrg::Jjwl),
            _ => None,
        }
    }
}

impl fmt::Display for SourceOrg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gym as reported by one federation. Identity is `(org, external_id)`;
/// `external_id` is unique within its org, as guaranteed by the fetchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGym {
    pub org: SourceOrg,
    pub external_id: String,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub responsible: Option<String>,
    /// Weak reference to the canonical gym. None means "not yet resolved".
    pub master_gym_id: Option<String>,
}

impl SourceGym {
    pub fn key(&self) -> (SourceOrg, String) {
        (self.org, self.external_id.clone())
    }

    pub fn is_resolved(&self) -> bool {
        self.master_gym_id.is_some()
    }
}

/// The canonical, deduplicated gym entity. One master may be referenced by
/// zero or more source gyms; orphan masters are valid and retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGym {
    pub id: String,
    pub canonical_name: String,
    /// Lowercase prefix-search key. Derived from `canonical_name` on every
    /// write path; never accepted as caller input.
    pub search_key: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-facing fields for creating a master gym. The id, search key and
/// timestamp are generated by the registry.
#[derive(Debug, Clone, Default)]
pub struct NewMasterGym {
    pub canonical_name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

impl NewMasterGym {
    pub fn from_source_gym(gym: &SourceGym) -> Self {
        Self {
            canonical_name: gym.name.clone(),
            city: gym.city.clone(),
            country: gym.country.clone(),
            address: gym.address.clone(),
            website: gym.website.clone(),
        }
    }
}

/// Explicit optional-field update for a master gym; `None` leaves a field
/// untouched. Replaces runtime-assembled update expressions with a shape the
/// compiler can check.
#[derive(Debug, Clone, Default)]
pub struct MasterGymUpdate {
    pub canonical_name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// A proposed link awaiting human adjudication. Created either by the
/// matching engine (score in the pending band, `candidate_master_id` set)
/// or by user onboarding (`submitted_name` set, no candidate). Resolved
/// exactly once by a reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMatch {
    pub id: String,
    pub org: SourceOrg,
    pub external_id: String,
    pub candidate_master_id: Option<String>,
    pub submitted_name: Option<String>,
    pub score: Option<f64>,
    pub status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
