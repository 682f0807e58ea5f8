//! Periodic reconciliation sweeps.
//!
//! Two independent loops:
//! * stale-upload sweep: purges attachment rows whose upload never completed
//!   and whose grace period has lapsed;
//! * audit retry sweep: replays every unconfirmed blob removal from the
//!   deletion audit log, clearing entries on clean removal.
//!
//! The audit sweep starts at a fixed offset from the stale-upload sweep so
//! the two do not run back to back against the same tables.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use docvault_core::Config;
use docvault_db::AttachmentRepository;
use docvault_storage::Storage;

use crate::audit_store::DeletionAuditStore;
use crate::removal::remove_blob;

#[derive(Clone)]
pub struct SweeperConfig {
    pub stale_upload_interval_secs: u64,
    pub stale_upload_grace_hours: i64,
    pub audit_retry_interval_secs: u64,
    pub audit_retry_offset_secs: u64,
}

impl SweeperConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_upload_interval_secs: config.stale_upload_sweep_interval_secs,
            stale_upload_grace_hours: config.stale_upload_grace_hours,
            audit_retry_interval_secs: config.audit_retry_sweep_interval_secs,
            audit_retry_offset_secs: config.audit_retry_sweep_offset_secs,
        }
    }
}

pub struct Sweeper {
    attachment_repository: AttachmentRepository,
    audit_store: Arc<dyn DeletionAuditStore>,
    storage: Arc<dyn Storage>,
    config: SweeperConfig,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl Sweeper {
    pub fn new(
        attachment_repository: AttachmentRepository,
        audit_store: Arc<dyn DeletionAuditStore>,
        storage: Arc<dyn Storage>,
        config: SweeperConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            attachment_repository,
            audit_store,
            storage,
            config,
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// Spawn both sweep loops. A sweep with a zero interval is disabled.
    pub fn spawn(mut self) -> SweeperHandle {
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .expect("Sweeper::spawn called twice");

        let (audit_stop_tx, mut audit_stop_rx) = mpsc::channel::<()>(1);

        if self.config.audit_retry_interval_secs > 0 {
            let audit_store = self.audit_store.clone();
            let storage = self.storage.clone();
            let offset = Duration::from_secs(self.config.audit_retry_offset_secs);
            let period = Duration::from_secs(self.config.audit_retry_interval_secs);
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + offset, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            run_audit_retry_sweep(audit_store.as_ref(), storage.as_ref()).await;
                        }
                        _ = audit_stop_rx.recv() => break,
                    }
                }
            });
        }

        if self.config.stale_upload_interval_secs > 0 {
            let attachment_repo = self.attachment_repository.clone();
            let grace_hours = self.config.stale_upload_grace_hours;
            let period = Duration::from_secs(self.config.stale_upload_interval_secs);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            run_stale_upload_sweep(&attachment_repo, grace_hours).await;
                        }
                        _ = shutdown_rx.recv() => {
                            let _ = audit_stop_tx.send(()).await;
                            break;
                        }
                    }
                }
            });
        } else {
            // Still honor shutdown for the audit loop.
            tokio::spawn(async move {
                let _ = shutdown_rx.recv().await;
                let _ = audit_stop_tx.send(()).await;
            });
        }

        tracing::info!(
            stale_upload_interval_secs = self.config.stale_upload_interval_secs,
            audit_retry_interval_secs = self.config.audit_retry_interval_secs,
            audit_retry_offset_secs = self.config.audit_retry_offset_secs,
            "Reconciliation sweeps started"
        );

        SweeperHandle { shutdown_tx }
    }
}

#[derive(Clone)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    pub async fn shutdown(&self) {
        tracing::info!("Stopping reconciliation sweeps");
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn run_stale_upload_sweep(repository: &AttachmentRepository, grace_hours: i64) {
    match repository.purge_failed_uploads(grace_hours).await {
        Ok(0) => tracing::debug!("Stale upload sweep found nothing to purge"),
        Ok(purged) => tracing::info!(purged, grace_hours, "Stale upload sweep purged rows"),
        Err(e) => tracing::error!(error = %e, "Stale upload sweep failed"),
    }
}

async fn run_audit_retry_sweep(audit_store: &dyn DeletionAuditStore, storage: &dyn Storage) {
    let entries = match audit_store.list_all().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "Audit retry sweep could not load entries");
            return;
        }
    };

    if entries.is_empty() {
        tracing::debug!("Audit retry sweep found no pending removals");
        return;
    }

    tracing::info!(pending = entries.len(), "Audit retry sweep replaying removals");
    for entry in &entries {
        remove_blob(audit_store, storage, entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryAuditStore, ScriptedStorage};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_audit_retry_sweep_drains_confirmed_removals() {
        let absent = Uuid::new_v4();
        let removable = Uuid::new_v4();
        let store = MemoryAuditStore::with_pending(&[absent, removable]);
        let storage = ScriptedStorage::new().missing(absent);

        run_audit_retry_sweep(&store, &storage).await;

        assert!(store.pending_attachments().is_empty());
    }

    #[tokio::test]
    async fn test_audit_retry_sweep_continues_past_failing_entry() {
        let first = Uuid::new_v4();
        let broken = Uuid::new_v4();
        let last = Uuid::new_v4();
        let store = MemoryAuditStore::with_pending(&[first, broken, last]);
        let storage = ScriptedStorage::new().failing(broken);

        run_audit_retry_sweep(&store, &storage).await;

        // The failing entry stays for the next sweep; the entries around it
        // were still processed.
        assert_eq!(store.pending_attachments(), vec![broken]);
    }

    #[tokio::test]
    async fn test_audit_retry_sweep_with_empty_log_is_a_no_op() {
        let store = MemoryAuditStore::new();
        let storage = ScriptedStorage::new();

        run_audit_retry_sweep(&store, &storage).await;

        assert!(store.pending_attachments().is_empty());
    }
}
