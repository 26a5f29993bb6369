//! Matching engine configuration
//! Thresholds and the generic-suffix vocabulary live here so operators can
//! tune precision/recall without code changes.

use log::{debug, info, warn};
use std::env;

use crate::matching::name::DEFAULT_GENERIC_SUFFIXES;

/// Score at or above which a source gym is linked to a master without review.
pub const DEFAULT_AUTO_LINK_THRESHOLD: f64 = 90.0;
/// Score at or above which (but below auto-link) a pair is queued for review.
pub const DEFAULT_PENDING_THRESHOLD: f64 = 70.0;
/// Added to the base score when either raw name contains the other record's city.
pub const DEFAULT_CITY_BOOST: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub auto_link_threshold: f64,
    pub pending_threshold: f64,
    pub city_boost: f64,
    /// Whole-word tokens stripped from gym names before comparison.
    pub generic_suffixes: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            auto_link_threshold: DEFAULT_AUTO_LINK_THRESHOLD,
            pending_threshold: DEFAULT_PENDING_THRESHOLD,
            city_boost: DEFAULT_CITY_BOOST,
            generic_suffixes: DEFAULT_GENERIC_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl MatchingConfig {
    /// Create configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env_f64("GYM_AUTO_LINK_THRESHOLD") {
            config.auto_link_threshold = v;
        }
        if let Some(v) = parse_env_f64("GYM_PENDING_THRESHOLD") {
            config.pending_threshold = v;
        }
        if let Some(v) = parse_env_f64("GYM_CITY_BOOST") {
            config.city_boost = v;
        }

        // Extra comma-separated suffixes appended to the built-in vocabulary.
        if let Ok(raw) = env::var("GYM_EXTRA_SUFFIXES") {
            let extra: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            debug!("Appending {} extra generic suffixes from env", extra.len());
            config.generic_suffixes.extend(extra);
        }

        if config.pending_threshold > config.auto_link_threshold {
            warn!(
                "Pending threshold {} exceeds auto-link threshold {}; every match above pending will auto-link",
                config.pending_threshold, config.auto_link_threshold
            );
        }

        config
    }

    /// Log the active configuration at startup.
    pub fn log_config(&self) {
        info!(
            "Matching thresholds: auto-link >= {}, pending >= {}, city boost +{}",
            self.auto_link_threshold, self.pending_threshold, self.city_boost
        );
        info!(
            "Generic suffix vocabulary: {} entries",
            self.generic_suffixes.len()
        );
    }
}

fn parse_env_f64(key: &str) -> Option<f64> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring unparseable {}={:?}", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}
