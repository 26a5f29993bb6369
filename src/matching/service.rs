// src/matching/service.rs - Scores one candidate gym against a pool
use log::debug;

use crate::config::MatchingConfig;
use crate::matching::name::SimilarityScorer;
use crate::matching::policy::{classify_score, MatchOutcome};
use crate::models::core::SourceGym;
use crate::models::matching::RankedMatch;

/// Scores a candidate against a comparison pool and returns ranked matches.
/// Pure scoring; never mutates the registry. Linear scan per candidate, so a
/// full sync is O(n^2) over the corpus — acceptable at single-digit
/// thousands of gyms per source, flagged as the scaling limit.
#[derive(Debug, Clone)]
pub struct GymMatchingService {
    scorer: SimilarityScorer,
    config: MatchingConfig,
}

impl GymMatchingService {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            scorer: SimilarityScorer::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    pub fn classify(&self, score: f64) -> MatchOutcome {
        classify_score(score, &self.config)
    }

    /// Score `candidate` against every gym in `pool` except itself, drop
    /// everything below the pending threshold, and sort best-first.
    ///
    /// Ties on score break deterministically: an exact city match wins,
    /// then the lexicographically smaller external id.
    pub fn find_matches_for_gym(
        &self,
        candidate: &SourceGym,
        pool: &[SourceGym],
    ) -> Vec<RankedMatch> {
        let mut matches: Vec<RankedMatch> = pool
            .iter()
            .filter(|other| {
                !(other.org == candidate.org && other.external_id == candidate.external_id)
            })
            .map(|other| {
                let (score, values) = self.scorer.score_detailed(
                    &candidate.name,
                    &other.name,
                    candidate.city.as_deref(),
                    other.city.as_deref(),
                );
                RankedMatch {
                    gym: other.clone(),
                    score,
                    values,
                }
            })
            .filter(|m| m.score >= self.config.pending_threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| {
                    let a_city = exact_city_match(candidate, &a.gym);
                    let b_city = exact_city_match(candidate, &b.gym);
                    b_city.cmp(&a_city)
                })
                .then_with(|| a.gym.external_id.cmp(&b.gym.external_id))
        });

        debug!(
            "Candidate {}/{} matched {} of {} pool gyms above pending threshold",
            candidate.org,
            candidate.external_id,
            matches.len(),
            pool.len()
        );

        matches
    }
}

fn exact_city_match(candidate: &SourceGym, other: &SourceGym) -> bool {
    match (candidate.city.as_deref(), other.city.as_deref()) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gym(org: crate::models::core::SourceOrg, id: &str, name: &str, city: Option<&str>) -> SourceGym {
        SourceGym {
            org,
            external_id: id.to_string(),
            name: name.to_string(),
            city: city.map(|c| c.to_string()),
            state: None,
            country: None,
            country_code: None,
            address: None,
            website: None,
            responsible: None,
            master_gym_id: Some(format!("master-{}", id)),
        }
    }

    use crate::models::core::SourceOrg::{Ibjjf, Jjwl};

    #[test]
    fn test_skips_candidate_itself() {
        let service = GymMatchingService::new(MatchingConfig::default());
        let candidate = gym(Ibjjf, "1", "Gracie Barra", Some("Miami"));
        let pool = vec![candidate.clone()];
        assert!(service.find_matches_for_gym(&candidate, &pool).is_empty());
    }

    #[test]
    fn test_filters_below_pending_threshold() {
        let service = GymMatchingService::new(MatchingConfig::default());
        let candidate = gym(Ibjjf, "1", "Gracie Barra", Some("Miami"));
        let pool = vec![
            gym(Jjwl, "2", "Gracie Barra", Some("Miami")),
            gym(Jjwl, "3", "Completely Different Wrestling Club", Some("Tokyo")),
        ];
        let matches = service.find_matches_for_gym(&candidate, &pool);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].gym.external_id, "2");
    }

    #[test]
    fn test_sorted_descending_by_score() {
        let service = GymMatchingService::new(MatchingConfig::default());
        let candidate = gym(Ibjjf, "1", "Gracie Barra Miami", Some("Miami"));
        let pool = vec![
            gym(Jjwl, "2", "Gracie Barra Margate", Some("Margate")),
            gym(Jjwl, "3", "Gracie Barra Miami", Some("Miami")),
        ];
        let matches = service.find_matches_for_gym(&candidate, &pool);
        assert!(matches.len() >= 2);
        assert_eq!(matches[0].gym.external_id, "3");
        assert!(matches[0].score >= matches[1].score);
    }

    #[test]
    fn test_tie_break_prefers_exact_city_then_external_id() {
        let service = GymMatchingService::new(MatchingConfig::default());
        let candidate = gym(Ibjjf, "1", "Alliance", Some("Atlanta"));
        // Identical names, identical scores; only the tie-breaks differ.
        let pool = vec![
            gym(Jjwl, "b", "Alliance", Some("Vancouver")),
            gym(Jjwl, "c", "Alliance", Some("Atlanta")),
            gym(Jjwl, "a", "Alliance", Some("Vancouver")),
        ];
        let matches = service.find_matches_for_gym(&candidate, &pool);
        assert_eq!(matches.len(), 3);
        // Exact city first, then id order among equals.
        assert_eq!(matches[0].gym.external_id, "c");
        assert_eq!(matches[1].gym.external_id, "a");
        assert_eq!(matches[2].gym.external_id, "b");
    }

    #[test]
    fn test_returns_score_breakdown() {
        let service = GymMatchingService::new(MatchingConfig::default());
        let candidate = gym(Ibjjf, "1", "Gracie Barra Miami", Some("Miami"));
        let pool = vec![gym(Jjwl, "2", "Gracie Barra BJJ", Some("Miami"))];
        let matches = service.find_matches_for_gym(&candidate, &pool);
        assert_eq!(matches.len(), 1);
        let values = &matches[0].values;
        assert_eq!(values.normalized_name_2, "gracie barra");
        assert!(values.base_score > 0.0);
        assert_eq!(values.city_boost, 15.0);
    }
}
