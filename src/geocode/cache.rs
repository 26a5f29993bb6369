// src/geocode/cache.rs - Memoized venue geocoding
//
// The vendor is rate-limited, so the whole point of this layer is to check
// the cache before every call. Failed geocodes are cached too (with a TTL)
// so unfetchable venues do not burn quota on every sync.
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::info;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{GeocodeConfidence, Geocoder};
use crate::utils::resolve::resolve_with_cache;

// Default cache size - can be configured via environment variable
const DEFAULT_CACHE_SIZE: usize = 10_000;

/// How long a failed geocode stays cached before the venue is retried.
const FAILED_GEOCODE_TTL_HOURS: i64 = 24 * 7;

/// Memoized geocode result for one normalized `(venue_name, city)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueCacheEntry {
    pub venue_id: String,
    pub venue_name: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub confidence: GeocodeConfidence,
    pub manual_override: bool,
    pub cached_at: DateTime<Utc>,
}

/// Cache lookup key: lowercased, trimmed `venue|city`.
pub fn venue_cache_key(venue: &str, city: &str) -> String {
    format!(
        "{}|{}",
        venue.trim().to_lowercase(),
        city.trim().to_lowercase()
    )
}

pub struct VenueGeocodeCache<G: Geocoder> {
    geocoder: G,
    entries: Mutex<LruCache<String, VenueCacheEntry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

pub type SharedVenueCache<G> = Arc<VenueGeocodeCache<G>>;

pub fn create_shared_venue_cache<G: Geocoder>(geocoder: G) -> SharedVenueCache<G> {
    Arc::new(VenueGeocodeCache::new(geocoder))
}

impl<G: Geocoder> VenueGeocodeCache<G> {
    pub fn new(geocoder: G) -> Self {
        let cache_size = std::env::var("VENUE_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE);

        info!("Initializing venue geocode cache with size: {}", cache_size);

        Self {
            geocoder,
            entries: Mutex::new(LruCache::new(NonZero::new(cache_size).unwrap())),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Resolve a venue to coordinates, geocoding at most once per normalized
    /// `(venue, city)` pair. An empty venue name falls back to the city
    /// itself as the lookup term. Zero vendor results come back as a cached
    /// entry with `confidence: failed` and no coordinates.
    pub async fn resolve_venue(
        &self,
        venue_name: &str,
        city: &str,
        country: Option<&str>,
    ) -> Result<VenueCacheEntry> {
        let lookup_name = if venue_name.trim().is_empty() {
            city
        } else {
            venue_name
        };

        let resolved = resolve_with_cache(
            (lookup_name, city),
            |(venue, city)| venue_cache_key(venue, city),
            |key| async move {
                let mut cache = self.entries.lock().await;
                match cache.get(&key) {
                    Some(entry) if entry_is_fresh(entry) => Ok(Some(entry.clone())),
                    Some(_) => {
                        // Expired failed entry: evict so the vendor is retried.
                        cache.pop(&key);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            },
            |_key| async move {
                let entry = match self.geocoder.geocode(lookup_name, city, country).await? {
                    Some(point) => VenueCacheEntry {
                        venue_id: Uuid::new_v4().to_string(),
                        venue_name: lookup_name.to_string(),
                        city: city.to_string(),
                        lat: Some(point.lat),
                        lng: Some(point.lng),
                        confidence: point.confidence,
                        manual_override: false,
                        cached_at: Utc::now(),
                    },
                    None => VenueCacheEntry {
                        venue_id: Uuid::new_v4().to_string(),
                        venue_name: lookup_name.to_string(),
                        city: city.to_string(),
                        lat: None,
                        lng: None,
                        confidence: GeocodeConfidence::Failed,
                        manual_override: false,
                        cached_at: Utc::now(),
                    },
                };
                Ok(entry)
            },
            |key, entry: VenueCacheEntry| async move {
                self.entries.lock().await.put(key, entry);
                Ok(())
            },
        )
        .await?;

        if resolved.from_cache {
            let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
            if hits % 100 == 0 {
                let misses = self.misses.load(Ordering::Relaxed);
                info!(
                    "Venue cache stats - hits: {}, misses: {}, hit rate: {:.2}%",
                    hits,
                    misses,
                    (hits as f64 / (hits + misses) as f64) * 100.0
                );
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        Ok(resolved.value)
    }

    /// Pin coordinates from manual review. Override entries never expire and
    /// are never refetched.
    pub async fn set_manual_override(
        &self,
        venue_name: &str,
        city: &str,
        lat: f64,
        lng: f64,
    ) -> VenueCacheEntry {
        let entry = VenueCacheEntry {
            venue_id: Uuid::new_v4().to_string(),
            venue_name: venue_name.to_string(),
            city: city.to_string(),
            lat: Some(lat),
            lng: Some(lng),
            confidence: GeocodeConfidence::High,
            manual_override: true,
            cached_at: Utc::now(),
        };
        self.entries
            .lock()
            .await
            .put(venue_cache_key(venue_name, city), entry.clone());
        entry
    }

    /// (hits, misses) since startup.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    #[cfg(test)]
    async fn insert_raw(&self, key: String, entry: VenueCacheEntry) {
        self.entries.lock().await.put(key, entry);
    }
}

/// Successful and manually pinned entries live forever; failed lookups age
/// out after the TTL so the venue gets another chance.
fn entry_is_fresh(entry: &VenueCacheEntry) -> bool {
    if entry.manual_override || entry.confidence != GeocodeConfidence::Failed {
        return true;
    }
    Utc::now() - entry.cached_at < Duration::hours(FAILED_GEOCODE_TTL_HOURS)
}
