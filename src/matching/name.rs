// src/matching/name.rs - Name normalization and pairwise similarity scoring
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use strsim::jaro_winkler;

use crate::config::MatchingConfig;
use crate::models::matching::MatchValues;

pub const MAX_SCORE: f64 = 100.0;

/// Generic gym-naming tokens stripped as whole words before comparison.
/// "Gracie Barra BJJ Academy" and "Gracie Barra Team" both reduce to
/// "gracie barra". Open vocabulary; extend via `GYM_EXTRA_SUFFIXES`.
pub const DEFAULT_GENERIC_SUFFIXES: [&str; 13] = [
    "brazilian jiu jitsu",
    "brazilian jiu-jitsu",
    "jiu jitsu",
    "jiu-jitsu",
    "jiujitsu",
    "bjj",
    "academy",
    "team",
    "mma",
    "martial arts",
    "training center",
    "hq",
    "headquarters",
];

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

/// Lowercase, replace every character outside `[a-z0-9\s]` with a space
/// (preserving token boundaries), collapse whitespace.
fn basic_clean(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, " ");
    collapse_whitespace(&replaced)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes gym display names for comparison. Pure and idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    suffix_pattern: Option<Regex>,
}

impl NameNormalizer {
    pub fn new(suffixes: &[String]) -> Self {
        // The vocabulary goes through the same character pass as the names,
        // so "jiu-jitsu" and "jiu jitsu" collapse to one entry.
        let mut cleaned: Vec<String> = suffixes
            .iter()
            .map(|s| basic_clean(s))
            .filter(|s| !s.is_empty())
            .collect();
        // Longest-first so multi-word phrases win over their sub-phrases.
        cleaned.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        cleaned.dedup();

        let suffix_pattern = if cleaned.is_empty() {
            None
        } else {
            let alternation = cleaned
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"\b(?:{})\b", alternation);
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Invalid suffix pattern: '{}'. Error: {}", pattern, e);
                    None
                }
            }
        };

        Self { suffix_pattern }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(&config.generic_suffixes)
    }

    pub fn normalize(&self, name: &str) -> String {
        let mut current = basic_clean(name);
        if let Some(pattern) = &self.suffix_pattern {
            // Stripping a token can join its neighbors into a new vocabulary
            // phrase, so repeat until a fixpoint; that is what makes the
            // function idempotent.
            loop {
                let stripped = collapse_whitespace(&pattern.replace_all(&current, " "));
                if stripped == current {
                    break;
                }
                current = stripped;
            }
        }
        current
    }
}

static DEFAULT_NORMALIZER: Lazy<NameNormalizer> = Lazy::new(|| {
    let suffixes: Vec<String> = DEFAULT_GENERIC_SUFFIXES
        .iter()
        .map(|s| s.to_string())
        .collect();
    NameNormalizer::new(&suffixes)
});

/// Normalize with the built-in vocabulary.
pub fn normalize_gym_name(name: &str) -> String {
    DEFAULT_NORMALIZER.normalize(name)
}

/// Computes a 0-100 match confidence between two gym records: Jaro-Winkler
/// over normalized names, plus a flat city boost when either raw name
/// contains the other record's city. Deterministic, pure, no I/O.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    normalizer: NameNormalizer,
    city_boost: f64,
}

impl SimilarityScorer {
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            normalizer: NameNormalizer::from_config(config),
            city_boost: config.city_boost,
        }
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn score(
        &self,
        name_a: &str,
        name_b: &str,
        city_a: Option<&str>,
        city_b: Option<&str>,
    ) -> f64 {
        self.score_detailed(name_a, name_b, city_a, city_b).0
    }

    /// Like `score`, but also returns the component breakdown for audit.
    pub fn score_detailed(
        &self,
        name_a: &str,
        name_b: &str,
        city_a: Option<&str>,
        city_b: Option<&str>,
    ) -> (f64, MatchValues) {
        let normalized_a = self.normalizer.normalize(name_a);
        let normalized_b = self.normalizer.normalize(name_b);

        let base_score = jaro_winkler(&normalized_a, &normalized_b) * MAX_SCORE;
        let boost = if city_boost_applies(name_a, name_b, city_a, city_b) {
            self.city_boost
        } else {
            0.0
        };
        let score = (base_score + boost).min(MAX_SCORE);

        (
            score,
            MatchValues {
                normalized_name_1: normalized_a,
                normalized_name_2: normalized_b,
                base_score,
                city_boost: boost,
            },
        )
    }
}

/// The boost rewards names like "Gracie Barra Miami" matching a record whose
/// city is "Miami". Applied only when both cities are known; a missing city
/// contributes no boost and no penalty.
fn city_boost_applies(
    name_a: &str,
    name_b: &str,
    city_a: Option<&str>,
    city_b: Option<&str>,
) -> bool {
    let (city_a, city_b) = match (city_a, city_b) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => (a, b),
        _ => return false,
    };
    let name_a = name_a.to_lowercase();
    let name_b = name_b.to_lowercase();
    name_a.contains(&city_b.trim().to_lowercase())
        || name_b.contains(&city_a.trim().to_lowercase())
}
