// src/geocode/mod.rs
pub mod cache;
pub mod client;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cache::{
    create_shared_venue_cache, venue_cache_key, SharedVenueCache, VenueCacheEntry,
    VenueGeocodeCache,
};
pub use client::HttpGeocoder;

/// Coarse precision tag for a resolved venue location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeConfidence {
    High,
    Low,
    Failed,
}

impl GeocodeConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocodeConfidence::High => "high",
            GeocodeConfidence::Low => "low",
            GeocodeConfidence::Failed => "failed",
        }
    }
}

/// A successful geocoder response. The provider's precision tier maps to
/// `High` (rooftop/interpolated) or `Low` (approximate/region-level);
/// `Failed` only ever originates in the cache layer for zero-result lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPoint {
    pub lat: f64,
    pub lng: f64,
    pub confidence: GeocodeConfidence,
    pub formatted_address: String,
}

/// The external geocoding collaborator. Vendor-rate-limited; callers go
/// through `VenueGeocodeCache` rather than hitting this directly.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns None on zero results.
    async fn geocode(
        &self,
        venue: &str,
        city: &str,
        country: Option<&str>,
    ) -> Result<Option<GeocodedPoint>>;
}
