use crate::config::SyncOptions;
use crate::error::SyncResult;
use crate::loader::ConfigGroup;
use crate::store::{ParameterStore, RemoteParameter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Diffs desired entries against the store and applies the minimal set of
/// mutations. Scoped to the group roots it is handed: entries outside
/// every supplied scope are never read or deleted.
pub struct ReconcileEngine {
    store: Arc<dyn ParameterStore>,
    options: SyncOptions
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated: u32,
    pub deleted: u32,
    pub untouched: u32,
    /// Names a delete batch could not resolve. Non-fatal, kept visible.
    pub unresolved: Vec<String>
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Folds a per-bucket report into this one. Timestamps stay those of
    /// the receiver; counters and unresolved names accumulate.
    pub fn merge(&mut self, other: ReconcileReport) {
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.untouched += other.untouched;
        self.unresolved.extend(other.unresolved);
    }
}

impl ReconcileEngine {
    pub fn new(store: Arc<dyn ParameterStore>, options: SyncOptions) -> Self {
        Self { store, options }
    }

    pub async fn reconcile(&self, groups: &[ConfigGroup]) -> SyncResult<ReconcileReport> {
        self.options.validate()?;

        let mut report = ReconcileReport::new();
        info!(
            groups = groups.len(),
            dry_run = self.options.dry_run,
            "Starting reconciliation"
        );

        let scopes = self.collect_scopes(groups);
        let existing = self.snapshot_existing(&scopes).await?;
        info!(
            scopes = scopes.len(),
            existing = existing.len(),
            "Snapshotted remote state"
        );

        let desired = desired_entries(groups);
        let existing_by_name: HashMap<&str, &str> = existing
            .iter()
            .map(|parameter| (parameter.name.as_str(), parameter.value.as_str()))
            .collect();

        let mut desired_keys: HashSet<&str> = HashSet::with_capacity(desired.len());
        for (key, value) in &desired {
            desired_keys.insert(key.as_str());
            match existing_by_name.get(key.as_str()) {
                Some(remote) if *remote == value.as_str() => {
                    report.untouched += 1;
                }
                _ => {
                    if !self.options.dry_run {
                        self.store.put(key, value).await?;
                    }
                    report.updated += 1;
                    debug!(key = %key, "Updated parameter");
                }
            }
        }

        let orphans: Vec<String> = existing
            .iter()
            .filter(|parameter| !desired_keys.contains(parameter.name.as_str()))
            .map(|parameter| parameter.name.clone())
            .collect();
        self.delete_orphans(&orphans, &mut report).await?;

        report.complete();
        info!(
            updated = report.updated,
            deleted = report.deleted,
            untouched = report.untouched,
            unresolved = report.unresolved.len(),
            "Reconciliation completed"
        );
        Ok(report)
    }

    /// Deletes every key the groups define, one name at a time. Names
    /// already absent count as satisfied.
    pub async fn destroy(&self, groups: &[ConfigGroup]) -> SyncResult<u64> {
        self.options.validate()?;

        let entries: usize = groups.iter().map(|group| group.entries.len()).sum();
        info!(
            groups = groups.len(),
            entries,
            dry_run = self.options.dry_run,
            "Destroying configuration parameters"
        );

        let mut removed = 0u64;
        for group in groups {
            for entry in &group.entries {
                if self.options.dry_run {
                    removed += 1;
                    continue;
                }
                if self.store.delete(&entry.key).await? {
                    removed += 1;
                    debug!(key = %entry.key, "Deleted parameter");
                }
            }
        }

        info!(removed, "Destroy completed");
        Ok(removed)
    }

    /// Distinct scope roots in first-seen order, normalized the same way
    /// the loader normalizes keys so queries match what was written.
    fn collect_scopes(&self, groups: &[ConfigGroup]) -> Vec<String> {
        let mut scopes: Vec<String> = Vec::new();
        for group in groups {
            let scope = self.normalize_scope(&group.root);
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    fn normalize_scope(&self, root: &str) -> String {
        match &self.options.account {
            Some(account) => root.replacen(&format!("/{account}"), "", 1),
            None => root.to_string()
        }
    }

    /// Point-in-time read of every queried scope, deduplicated across
    /// overlapping scopes. Taken before any write; this is the closed
    /// world for orphan detection.
    async fn snapshot_existing(&self, scopes: &[String]) -> SyncResult<Vec<RemoteParameter>> {
        let mut existing: Vec<RemoteParameter> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for scope in scopes {
            for parameter in self.store.get_by_path(scope).await? {
                if seen.insert(parameter.name.clone()) {
                    existing.push(parameter);
                }
            }
        }
        Ok(existing)
    }

    async fn delete_orphans(
        &self,
        orphans: &[String],
        report: &mut ReconcileReport
    ) -> SyncResult<()> {
        if orphans.is_empty() {
            return Ok(());
        }

        info!(count = orphans.len(), "Deleting orphaned parameters");
        for chunk in orphans.chunks(self.options.delete_batch_size) {
            if self.options.dry_run {
                report.deleted += chunk.len() as u32;
                continue;
            }

            let outcome = self.store.delete_many(chunk).await?;
            report.deleted += chunk.len() as u32;
            if !outcome.unresolved.is_empty() {
                warn!(
                    unresolved = ?outcome.unresolved,
                    "Delete batch left names unresolved"
                );
                report.unresolved.extend(outcome.unresolved);
            }
        }
        Ok(())
    }
}

/// One desired map across all groups: later group overwrites earlier on
/// key collision, first-seen position preserved.
fn desired_entries(groups: &[ConfigGroup]) -> Vec<(String, String)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut desired: Vec<(String, String)> = Vec::new();
    for group in groups {
        for entry in &group.entries {
            match index.get(&entry.key) {
                Some(&position) => desired[position].1 = entry.value.clone(),
                None => {
                    index.insert(entry.key.clone(), desired.len());
                    desired.push((entry.key.clone(), entry.value.clone()));
                }
            }
        }
    }
    desired
}
