// src/registry/mod.rs - Canonical gym identity store
//
// Holds master gyms, the source-gym records that weakly reference them, and
// the pending-match queue for human review. Reads and writes go through
// tokio RwLocks; lock order is masters -> source_gyms -> pending and locks
// are never held across calls that take another one out of order.
use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, info};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::core::{
    MasterGym, MasterGymUpdate, NewMasterGym, PendingMatch, ReviewStatus, SourceGym, SourceOrg,
};
use crate::utils::resolve::{resolve_with_cache, Resolved};

/// Reviewer decision for a pending match or gym submission.
#[derive(Debug, Clone)]
pub enum ReviewResolution {
    /// Link the source gym to an existing master.
    LinkExisting { master_gym_id: String },
    /// Create a fresh master from the source gym (or the submitted name)
    /// and link to it.
    CreateNew,
    /// Discard the proposal; no registry mutation.
    Reject,
}

#[derive(Default)]
pub struct MasterGymRegistry {
    masters: RwLock<HashMap<String, MasterGym>>,
    source_gyms: RwLock<HashMap<(SourceOrg, String), SourceGym>>,
    pending: RwLock<HashMap<String, PendingMatch>>,
}

impl MasterGymRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Source gyms
    // ------------------------------------------------------------------

    /// Upsert by `(org, external_id)`. Attribute fields are refreshed from
    /// the incoming record; an existing master link survives a re-sync that
    /// carries no link of its own.
    pub async fn upsert_source_gym(&self, mut gym: SourceGym) -> Result<SourceGym> {
        if gym.name.trim().is_empty() {
            bail!(
                "Refusing source gym {}/{} with empty name",
                gym.org,
                gym.external_id
            );
        }

        let mut gyms = self.source_gyms.write().await;
        if gym.master_gym_id.is_none() {
            if let Some(existing) = gyms.get(&gym.key()) {
                gym.master_gym_id = existing.master_gym_id.clone();
            }
        }
        gyms.insert(gym.key(), gym.clone());
        Ok(gym)
    }

    pub async fn get_source_gym(&self, org: SourceOrg, external_id: &str) -> Option<SourceGym> {
        self.source_gyms
            .read()
            .await
            .get(&(org, external_id.to_string()))
            .cloned()
    }

    /// The comparison pool: every source gym already resolved to a master,
    /// across all federations.
    pub async fn linked_source_gyms(&self) -> Vec<SourceGym> {
        self.source_gyms
            .read()
            .await
            .values()
            .filter(|g| g.is_resolved())
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Master gyms
    // ------------------------------------------------------------------

    /// The search key is derived from `canonical_name` here, on every write
    /// path; callers can never supply one that drifts.
    pub async fn create_master_gym(&self, new: NewMasterGym) -> Result<MasterGym> {
        let canonical_name = new.canonical_name.trim().to_string();
        if canonical_name.is_empty() {
            bail!("Refusing master gym with empty canonical name");
        }

        let master = MasterGym {
            id: Uuid::new_v4().to_string(),
            search_key: canonical_name.to_lowercase(),
            canonical_name,
            city: new.city,
            country: new.country,
            address: new.address,
            website: new.website,
            created_at: Utc::now(),
        };

        self.masters
            .write()
            .await
            .insert(master.id.clone(), master.clone());
        info!(
            "Created master gym {} ({})",
            master.canonical_name, master.id
        );
        Ok(master)
    }

    pub async fn get_master_gym(&self, id: &str) -> Option<MasterGym> {
        self.masters.read().await.get(id).cloned()
    }

    /// Apply an explicit partial update. A name change re-derives the search
    /// key in the same write, so the key can never go stale against the
    /// canonical name.
    pub async fn update_master_gym(
        &self,
        id: &str,
        update: MasterGymUpdate,
    ) -> Result<MasterGym> {
        if let Some(name) = &update.canonical_name {
            if name.trim().is_empty() {
                bail!("Refusing to rename master gym {} to an empty name", id);
            }
        }

        let mut masters = self.masters.write().await;
        let master = masters
            .get_mut(id)
            .with_context(|| format!("Master gym {} not found for update", id))?;
        if let Some(name) = update.canonical_name {
            let name = name.trim().to_string();
            master.search_key = name.to_lowercase();
            master.canonical_name = name;
        }
        if let Some(city) = update.city {
            master.city = Some(city);
        }
        if let Some(country) = update.country {
            master.country = Some(country);
        }
        if let Some(address) = update.address {
            master.address = Some(address);
        }
        if let Some(website) = update.website {
            master.website = Some(website);
        }
        Ok(master.clone())
    }

    pub async fn rename_master_gym(&self, id: &str, new_name: &str) -> Result<MasterGym> {
        self.update_master_gym(
            id,
            MasterGymUpdate {
                canonical_name: Some(new_name.to_string()),
                ..MasterGymUpdate::default()
            },
        )
        .await
    }

    /// Case-insensitive prefix search against the lowercase search key.
    pub async fn search_master_gyms(&self, name_prefix: &str, limit: usize) -> Vec<MasterGym> {
        let prefix = name_prefix.trim().to_lowercase();
        let masters = self.masters.read().await;
        let mut results: Vec<MasterGym> = masters
            .values()
            .filter(|m| m.search_key.starts_with(&prefix))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.search_key.cmp(&b.search_key).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);
        results
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Idempotently set the weak reference; safe to repeat with the same
    /// target.
    pub async fn link_source_gym_to_master(
        &self,
        org: SourceOrg,
        external_id: &str,
        master_gym_id: &str,
    ) -> Result<()> {
        if self.get_master_gym(master_gym_id).await.is_none() {
            bail!("Cannot link to unknown master gym {}", master_gym_id);
        }

        let mut gyms = self.source_gyms.write().await;
        let gym = gyms
            .get_mut(&(org, external_id.to_string()))
            .with_context(|| format!("Source gym {}/{} not found for link", org, external_id))?;
        gym.master_gym_id = Some(master_gym_id.to_string());
        debug!("Linked {}/{} -> {}", org, external_id, master_gym_id);
        Ok(())
    }

    /// Clears the weak reference. The master gym is retained even when the
    /// unlink leaves it with zero references; orphan masters are valid.
    pub async fn unlink_source_gym_from_master(
        &self,
        org: SourceOrg,
        external_id: &str,
    ) -> Result<()> {
        let mut gyms = self.source_gyms.write().await;
        let gym = gyms
            .get_mut(&(org, external_id.to_string()))
            .with_context(|| format!("Source gym {}/{} not found for unlink", org, external_id))?;
        gym.master_gym_id = None;
        debug!("Unlinked {}/{}", org, external_id);
        Ok(())
    }

    /// Get-or-create: return the master a source gym already resolves to,
    /// or create one from the gym's own attributes and link to it. Goes
    /// through the shared cache-or-compute helper.
    pub async fn ensure_master_for(&self, gym: &SourceGym) -> Result<Resolved<MasterGym>> {
        resolve_with_cache(
            gym.key(),
            |key| key.clone(),
            |key| async move {
                let link = self
                    .source_gyms
                    .read()
                    .await
                    .get(&key)
                    .and_then(|g| g.master_gym_id.clone());
                match link {
                    Some(master_id) => Ok(self.get_master_gym(&master_id).await),
                    None => Ok(None),
                }
            },
            |_key| async move { self.create_master_gym(NewMasterGym::from_source_gym(gym)).await },
            |key, master: MasterGym| async move {
                self.link_source_gym_to_master(key.0, &key.1, &master.id).await
            },
        )
        .await
    }

    // ------------------------------------------------------------------
    // Pending matches / gym submissions
    // ------------------------------------------------------------------

    /// Queue an engine-proposed link for human review.
    pub async fn create_pending_match(
        &self,
        gym: &SourceGym,
        candidate_master_id: &str,
        score: f64,
    ) -> Result<PendingMatch> {
        if self.get_master_gym(candidate_master_id).await.is_none() {
            bail!(
                "Cannot queue pending match against unknown master gym {}",
                candidate_master_id
            );
        }

        let record = PendingMatch {
            id: Uuid::new_v4().to_string(),
            org: gym.org,
            external_id: gym.external_id.clone(),
            candidate_master_id: Some(candidate_master_id.to_string()),
            submitted_name: None,
            score: Some(score),
            status: ReviewStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        self.pending
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        debug!(
            "Queued pending match {} for {}/{} (score {:.1})",
            record.id, gym.org, gym.external_id, score
        );
        Ok(record)
    }

    /// Queue a user-submitted free-text gym name with no candidate master.
    pub async fn create_gym_submission(
        &self,
        org: SourceOrg,
        external_id: &str,
        submitted_name: &str,
    ) -> Result<PendingMatch> {
        let submitted_name = submitted_name.trim();
        if submitted_name.is_empty() {
            bail!("Refusing gym submission with empty name");
        }

        let record = PendingMatch {
            id: Uuid::new_v4().to_string(),
            org,
            external_id: external_id.to_string(),
            candidate_master_id: None,
            submitted_name: Some(submitted_name.to_string()),
            score: None,
            status: ReviewStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        self.pending
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub async fn get_pending_match(&self, id: &str) -> Option<PendingMatch> {
        self.pending.read().await.get(id).cloned()
    }

    pub async fn list_pending_matches(&self) -> Vec<PendingMatch> {
        let mut records: Vec<PendingMatch> = self
            .pending
            .read()
            .await
            .values()
            .filter(|p| p.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Apply a reviewer decision. A record resolves exactly once; a second
    /// attempt fails without touching the registry.
    pub async fn resolve_pending_match(
        &self,
        id: &str,
        reviewer: &str,
        resolution: ReviewResolution,
    ) -> Result<PendingMatch> {
        let record = self
            .get_pending_match(id)
            .await
            .with_context(|| format!("Pending match {} not found", id))?;
        if record.status != ReviewStatus::Pending {
            bail!(
                "Pending match {} already resolved ({})",
                id,
                record.status.as_str()
            );
        }

        let new_status = match &resolution {
            ReviewResolution::LinkExisting { master_gym_id } => {
                self.link_source_gym_to_master(record.org, &record.external_id, master_gym_id)
                    .await?;
                ReviewStatus::Approved
            }
            ReviewResolution::CreateNew => {
                let new_master = match self.get_source_gym(record.org, &record.external_id).await {
                    Some(gym) => NewMasterGym::from_source_gym(&gym),
                    None => match &record.submitted_name {
                        Some(name) => NewMasterGym {
                            canonical_name: name.clone(),
                            ..NewMasterGym::default()
                        },
                        None => bail!(
                            "Pending match {} has neither a source gym nor a submitted name",
                            id
                        ),
                    },
                };
                let master = self.create_master_gym(new_master).await?;
                // Submissions may predate the source gym record; link only
                // when there is a record to link.
                if self
                    .get_source_gym(record.org, &record.external_id)
                    .await
                    .is_some()
                {
                    self.link_source_gym_to_master(record.org, &record.external_id, &master.id)
                        .await?;
                }
                ReviewStatus::Approved
            }
            ReviewResolution::Reject => ReviewStatus::Rejected,
        };

        let mut pending = self.pending.write().await;
        let stored = pending
            .get_mut(id)
            .with_context(|| format!("Pending match {} disappeared during resolution", id))?;
        if stored.status != ReviewStatus::Pending {
            bail!(
                "Pending match {} already resolved ({})",
                id,
                stored.status.as_str()
            );
        }
        stored.status = new_status;
        stored.reviewed_by = Some(reviewer.to_string());
        stored.reviewed_at = Some(Utc::now());
        info!(
            "Pending match {} resolved as {} by {}",
            id,
            stored.status.as_str(),
            reviewer
        );
        Ok(stored.clone())
    }
}
