//! One reconciliation run: roles, then channel structure, under a per-server lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use keystone_common::blueprint::Blueprint;
use keystone_common::error::{KeystoneError, KeystoneResult};
use keystone_common::models::StructureDocument;
use keystone_common::validation::validate_document;

use crate::channels::ChannelReconciler;
use crate::overwrites::{LiveRoleIndex, OverwriteResolver};
use crate::pacing::Pacing;
use crate::report::{Action, ResourceKind, RunReport, Tally};
use crate::roles::RoleReconciler;
use crate::snapshot::RemoteSnapshot;
use crate::store::RemoteStore;

/// Server ids with a run in flight.
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    active: Arc<Mutex<HashSet<String>>>,
}

impl RunLock {
    fn set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `None` if a run for `server_id` already holds the lock.
    pub fn try_acquire(&self, server_id: &str) -> Option<RunGuard> {
        if !self.set().insert(server_id.to_owned()) {
            return None;
        }
        Some(RunGuard { lock: self.clone(), server_id: server_id.to_owned() })
    }

    pub fn is_held(&self, server_id: &str) -> bool {
        self.set().contains(server_id)
    }
}

/// Releases the server's lock on drop.
#[derive(Debug)]
pub struct RunGuard {
    lock: RunLock,
    server_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.lock.set().remove(&self.server_id);
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    blueprint: Arc<Blueprint>,
    pacing: Pacing,
    locks: RunLock,
}

impl Orchestrator {
    pub fn new(blueprint: Arc<Blueprint>, pacing: Pacing) -> Self {
        Self { blueprint, pacing, locks: RunLock::default() }
    }

    pub fn locks(&self) -> &RunLock {
        &self.locks
    }

    /// Bring the server in line with the blueprint and `document`.
    ///
    /// Fails before any mutation if the document is invalid, the server cannot
    /// be read, or another run for the same server is in progress. Everything
    /// after that is best effort and reported in the returned [`RunReport`].
    pub async fn run(&self, store: &dyn RemoteStore, document: &StructureDocument) -> KeystoneResult<RunReport> {
        let server_id = store.server_id().to_owned();
        let _guard = self
            .locks
            .try_acquire(&server_id)
            .ok_or_else(|| KeystoneError::RunInProgress { server_id: server_id.clone() })?;

        validate_document(document)?;

        let started_at = Utc::now();
        tracing::info!(server_id = %server_id, "Reconciliation started");

        let before = RemoteSnapshot::roles_only(store)
            .await
            .map_err(|e| KeystoneError::from_lookup(format!("Server {server_id}"), e))?;

        let roles = RoleReconciler::new(store, &self.blueprint, self.pacing).reconcile(&before).await;

        let (categories, channels) = match RemoteSnapshot::take(store).await {
            Ok(snapshot) => {
                let index = LiveRoleIndex::build(&self.blueprint, &snapshot, &roles.created);
                tracing::debug!(server_id = %server_id, roles = index.len(), "Live role index built");
                let resolver = OverwriteResolver::new(&self.blueprint, &index);
                let outcome = ChannelReconciler::new(store, &self.blueprint, resolver, self.pacing)
                    .reconcile(document, snapshot)
                    .await;
                (outcome.categories, outcome.channels)
            }
            Err(e) => {
                let mut channels = Tally::default();
                channels.record_failure(Action::Refresh, ResourceKind::Channel, "server snapshot", e);
                (Tally::default(), channels)
            }
        };

        let report = RunReport {
            server_id,
            started_at,
            finished_at: Utc::now(),
            roles: roles.tally,
            categories,
            channels,
        };
        tracing::info!(
            server_id = %report.server_id,
            errors = report.total_errors(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Reconciliation finished"
        );
        Ok(report)
    }
}
