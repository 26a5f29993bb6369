// src/sync/orchestrator.rs - End-to-end batch gym resolution
//
// Per source gym the run is a small state machine:
// fetched -> already-linked skip -> scored against pool ->
// auto-link | pending review | new master created.
// Every gym ends a run either resolved or queued for review, never in limbo.
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::SourceFetcher;
use crate::config::MatchingConfig;
use crate::matching::policy::MatchOutcome;
use crate::matching::service::GymMatchingService;
use crate::models::core::SourceGym;
use crate::models::stats::{SourceSyncStats, SyncRunStats};
use crate::registry::MasterGymRegistry;

pub struct GymSyncOrchestrator {
    registry: Arc<MasterGymRegistry>,
    matcher: GymMatchingService,
}

impl GymSyncOrchestrator {
    pub fn new(registry: Arc<MasterGymRegistry>, config: MatchingConfig) -> Self {
        Self {
            registry,
            matcher: GymMatchingService::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<MasterGymRegistry> {
        &self.registry
    }

    /// Run every source concurrently and aggregate the per-source stats.
    /// One source's failure is reported in its own stats entry and never
    /// blocks the others.
    pub async fn run(
        &self,
        fetchers: &[Arc<dyn SourceFetcher>],
        multi_progress: Option<&MultiProgress>,
    ) -> SyncRunStats {
        let run_id = Uuid::new_v4().to_string();
        let run_timestamp = Utc::now();
        let started = Instant::now();
        info!("Starting gym sync run {} over {} sources", run_id, fetchers.len());

        let source_futures: Vec<_> = fetchers
            .iter()
            .map(|fetcher| self.sync_source(fetcher.as_ref(), multi_progress))
            .collect();
        let per_source = futures::future::join_all(source_futures).await;

        for failed in per_source.iter().filter(|s| s.error.is_some()) {
            warn!(
                "[{}] Source sync failed: {}",
                failed.org,
                failed.error.as_deref().unwrap_or("unknown")
            );
        }

        SyncRunStats {
            run_id,
            run_timestamp,
            per_source,
            total_duration_secs: started.elapsed().as_secs_f64(),
        }
    }

    /// Sync one federation. Fetch failures land in `stats.error`; per-gym
    /// failures are counted and skipped so one bad record cannot sink the
    /// batch.
    pub async fn sync_source(
        &self,
        fetcher: &dyn SourceFetcher,
        multi_progress: Option<&MultiProgress>,
    ) -> SourceSyncStats {
        let org = fetcher.org();
        let started = Instant::now();
        let mut stats = SourceSyncStats::new(org);

        info!("[{}] Fetching source gyms", org);
        let gyms = match fetcher.fetch_gyms().await {
            Ok(gyms) => gyms,
            Err(e) => {
                warn!("[{}] Fetch failed: {:#}", org, e);
                stats.error = Some(format!("{:#}", e));
                stats.duration_secs = started.elapsed().as_secs_f64();
                return stats;
            }
        };
        stats.fetched = gyms.len();
        info!("[{}] Fetched {} gyms", org, stats.fetched);

        // One pool snapshot per source run: every already-resolved gym
        // across federations. Gyms resolved during this run join the pool
        // on the next run, which keeps a single run order-independent.
        let pool = self.registry.linked_source_gyms().await;

        let pb = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(gyms.len() as u64));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "  🥋 [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} {msg}",
                    )
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            pb.set_message(format!("Resolving {} gyms", org));
            pb
        });

        for gym in gyms {
            if gym.name.trim().is_empty() {
                warn!("[{}] Skipping record {} with empty name", org, gym.external_id);
                stats.individual_operation_errors += 1;
                continue;
            }
            if let Err(e) = self.process_gym(gym, &pool, &mut stats).await {
                warn!("[{}] Failed to process gym: {:#}", org, e);
                stats.individual_operation_errors += 1;
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish_with_message(format!("{} done", org));
        }

        stats.duration_secs = started.elapsed().as_secs_f64();
        info!(
            "[{}] Sync complete in {:.2}s: {} fetched, {} skipped (linked), {} auto-linked, {} pending, {} masters created, {} errors",
            org,
            stats.duration_secs,
            stats.fetched,
            stats.skipped_linked,
            stats.auto_linked,
            stats.pending_review,
            stats.masters_created,
            stats.individual_operation_errors
        );
        stats
    }

    async fn process_gym(
        &self,
        gym: SourceGym,
        pool: &[SourceGym],
        stats: &mut SourceSyncStats,
    ) -> Result<()> {
        let saved = self.registry.upsert_source_gym(gym).await?;
        stats.saved += 1;

        // Idempotent re-sync: a gym that already resolved keeps its link.
        if saved.is_resolved() {
            stats.skipped_linked += 1;
            return Ok(());
        }

        let matches = self.matcher.find_matches_for_gym(&saved, pool);
        match matches.first() {
            Some(top) => {
                let master_id = top.gym.master_gym_id.as_deref().with_context(|| {
                    format!(
                        "Pool gym {}/{} has no master link",
                        top.gym.org, top.gym.external_id
                    )
                })?;
                match self.matcher.classify(top.score) {
                    MatchOutcome::AutoLink => {
                        self.registry
                            .link_source_gym_to_master(saved.org, &saved.external_id, master_id)
                            .await?;
                        stats.auto_linked += 1;
                    }
                    MatchOutcome::Pending => {
                        self.registry
                            .create_pending_match(&saved, master_id, top.score)
                            .await?;
                        stats.pending_review += 1;
                    }
                    // The service already filters below-pending scores, so
                    // this only fires if the thresholds disagree; fall
                    // through to a fresh master.
                    MatchOutcome::NoMatch => {
                        self.create_master_for(&saved, stats).await?;
                    }
                }
            }
            None => {
                self.create_master_for(&saved, stats).await?;
            }
        }
        Ok(())
    }

    async fn create_master_for(
        &self,
        gym: &SourceGym,
        stats: &mut SourceSyncStats,
    ) -> Result<()> {
        let resolved = self.registry.ensure_master_for(gym).await?;
        if !resolved.from_cache {
            stats.masters_created += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::SourceOrg::{self, Ibjjf, Jjwl};
    use crate::models::core::{NewMasterGym, ReviewStatus};
    use async_trait::async_trait;

    struct FakeFetcher {
        org: SourceOrg,
        gyms: Result<Vec<SourceGym>, String>,
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        fn org(&self) -> SourceOrg {
            self.org
        }

        async fn fetch_gyms(&self) -> Result<Vec<SourceGym>> {
            match &self.gyms {
                Ok(gyms) => Ok(gyms.clone()),
                Err(msg) => anyhow::bail!("{}", msg.clone()),
            }
        }
    }

    fn gym(org: SourceOrg, id: &str, name: &str, city: Option<&str>) -> SourceGym {
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
            master_gym_id: None,
        }
    }

    fn orchestrator() -> GymSyncOrchestrator {
        GymSyncOrchestrator::new(Arc::new(MasterGymRegistry::new()), MatchingConfig::default())
    }

    /// Seed a resolved gym so it shows up in the matching pool.
    async fn seed_linked(
        registry: &MasterGymRegistry,
        org: SourceOrg,
        id: &str,
        name: &str,
        city: Option<&str>,
    ) -> String {
        let seeded = registry.upsert_source_gym(gym(org, id, name, city)).await.unwrap();
        let master = registry
            .create_master_gym(NewMasterGym::from_source_gym(&seeded))
            .await
            .unwrap();
        registry
            .link_source_gym_to_master(org, id, &master.id)
            .await
            .unwrap();
        master.id
    }

    #[tokio::test]
    async fn test_unmatched_gym_gets_new_master_and_link() {
        let orch = orchestrator();
        let fetcher = FakeFetcher {
            org: Ibjjf,
            gyms: Ok(vec![gym(Ibjjf, "g1", "Pablo Silva BJJ", Some("Bellaire"))]),
        };

        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.fetched, 1);
        assert_eq!(stats.masters_created, 1);
        assert_eq!(stats.auto_linked, 0);
        assert_eq!(stats.pending_review, 0);
        assert!(stats.error.is_none());

        let saved = orch.registry().get_source_gym(Ibjjf, "g1").await.unwrap();
        let master_id = saved.master_gym_id.expect("gym must end the run linked");
        let master = orch.registry().get_master_gym(&master_id).await.unwrap();
        assert_eq!(master.canonical_name, "Pablo Silva BJJ");
        assert_eq!(master.city.as_deref(), Some("Bellaire"));
    }

    #[tokio::test]
    async fn test_high_confidence_match_auto_links() {
        let orch = orchestrator();
        let master_id =
            seed_linked(orch.registry(), Jjwl, "seed", "Pablo Silva BJJ", Some("Bellaire")).await;

        // Same gym under the other federation: normalizes identically,
        // scores 100, auto-links to the seeded master.
        let fetcher = FakeFetcher {
            org: Ibjjf,
            gyms: Ok(vec![gym(Ibjjf, "g2", "Pablo Silva Brazilian Jiu-Jitsu", None)]),
        };
        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.auto_linked, 1);
        assert_eq!(stats.masters_created, 0);

        let saved = orch.registry().get_source_gym(Ibjjf, "g2").await.unwrap();
        assert_eq!(saved.master_gym_id.as_deref(), Some(master_id.as_str()));
    }

    #[tokio::test]
    async fn test_ambiguous_match_queues_pending() {
        // Raise the auto-link bar above the maximum score so even an exact
        // name lands in the pending band.
        let config = MatchingConfig {
            auto_link_threshold: 100.5,
            ..MatchingConfig::default()
        };
        let registry = Arc::new(MasterGymRegistry::new());
        let orch = GymSyncOrchestrator::new(registry.clone(), config);
        let master_id = seed_linked(&registry, Jjwl, "seed", "Alliance", Some("Atlanta")).await;

        let fetcher = FakeFetcher {
            org: Ibjjf,
            gyms: Ok(vec![gym(Ibjjf, "g3", "Alliance", Some("Atlanta"))]),
        };
        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.pending_review, 1);
        assert_eq!(stats.auto_linked, 0);
        assert_eq!(stats.masters_created, 0);

        // The gym stays unresolved until a reviewer acts.
        let saved = registry.get_source_gym(Ibjjf, "g3").await.unwrap();
        assert_eq!(saved.master_gym_id, None);

        let pending = registry.list_pending_matches().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, ReviewStatus::Pending);
        assert_eq!(
            pending[0].candidate_master_id.as_deref(),
            Some(master_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_already_linked_gym_is_skipped() {
        let orch = orchestrator();
        seed_linked(orch.registry(), Ibjjf, "g1", "Checkmat", Some("Long Beach")).await;

        // Re-sync delivers the same record fresh (no link on the wire).
        let fetcher = FakeFetcher {
            org: Ibjjf,
            gyms: Ok(vec![gym(Ibjjf, "g1", "Checkmat", Some("Long Beach"))]),
        };
        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.skipped_linked, 1);
        assert_eq!(stats.auto_linked, 0);
        assert_eq!(stats.masters_created, 0);
        assert_eq!(stats.pending_review, 0);
    }

    #[tokio::test]
    async fn test_empty_name_rejected_at_boundary() {
        let orch = orchestrator();
        let fetcher = FakeFetcher {
            org: Jjwl,
            gyms: Ok(vec![gym(Jjwl, "bad", "   ", None), gym(Jjwl, "ok", "Atos", None)]),
        };
        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.individual_operation_errors, 1);
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.masters_created, 1);
    }

    #[tokio::test]
    async fn test_one_source_failure_does_not_block_the_other() {
        let orch = orchestrator();
        let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![
            Arc::new(FakeFetcher {
                org: Ibjjf,
                gyms: Err("federation site down".to_string()),
            }),
            Arc::new(FakeFetcher {
                org: Jjwl,
                gyms: Ok(vec![gym(Jjwl, "g1", "Atos", Some("San Diego"))]),
            }),
        ];

        let run = orch.run(&fetchers, None).await;
        assert_eq!(run.per_source.len(), 2);

        let ibjjf = run.per_source.iter().find(|s| s.org == Ibjjf).unwrap();
        assert!(ibjjf.error.as_deref().unwrap().contains("federation site down"));
        assert_eq!(ibjjf.fetched, 0);

        let jjwl = run.per_source.iter().find(|s| s.org == Jjwl).unwrap();
        assert!(jjwl.error.is_none());
        assert_eq!(jjwl.masters_created, 1);
        assert_eq!(run.total_masters_created(), 1);
        assert_eq!(run.failed_sources().len(), 1);
    }

    #[tokio::test]
    async fn test_cross_source_pool_is_used() {
        let orch = orchestrator();
        // Two distinct seeded masters; the new gym must pick the right one.
        seed_linked(orch.registry(), Jjwl, "s1", "Gracie Barra", Some("Miami")).await;
        let atos_master =
            seed_linked(orch.registry(), Jjwl, "s2", "Atos Jiu-Jitsu", Some("San Diego")).await;

        let fetcher = FakeFetcher {
            org: Ibjjf,
            gyms: Ok(vec![gym(Ibjjf, "g7", "Atos BJJ", Some("San Diego"))]),
        };
        let stats = orch.sync_source(&fetcher, None).await;
        assert_eq!(stats.auto_linked, 1);

        let saved = orch.registry().get_source_gym(Ibjjf, "g7").await.unwrap();
        assert_eq!(saved.master_gym_id.as_deref(), Some(atos_master.as_str()));
    }
}
