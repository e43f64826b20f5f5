//! Non-blocking audit recording over a bounded queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use adminhub_core::config::{AuditConfig, AuditOverflowPolicy};
use adminhub_core::result::AppResult;
use adminhub_core::types::pagination::{PageRequest, PageResponse};
use adminhub_database::repositories::AuditLogRepository;
use adminhub_entity::audit::{AuditLogEntry, AuditQuery};

use super::worker::{AuditWorker, AuditWorkerHandle};

/// Records audit entries without making callers wait on storage.
///
/// Entries go into a bounded queue drained by one background writer. When
/// the queue is full the configured overflow policy decides whether to
/// drop immediately or wait briefly first; either way a dropped entry is
/// counted and logged, never reported to the caller.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    sender: mpsc::Sender<AuditLogEntry>,
    repo: Arc<dyn AuditLogRepository>,
    policy: AuditOverflowPolicy,
    block_timeout: Duration,
    dropped: Arc<AtomicU64>,
}

impl AuditTrail {
    /// Spawns the writer task and returns the trail plus a handle to stop it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        repo: Arc<dyn AuditLogRepository>,
        config: &AuditConfig,
    ) -> (Self, AuditWorkerHandle) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let shutdown = CancellationToken::new();

        let worker = AuditWorker::new(receiver, repo.clone(), config, shutdown.clone());
        let join = tokio::spawn(worker.run());

        info!(
            capacity = config.queue_capacity,
            policy = %config.overflow_policy,
            "Audit trail started"
        );

        let handle = AuditWorkerHandle::new(
            shutdown,
            join,
            Duration::from_secs(config.shutdown_timeout_seconds),
        );
        (Self::from_parts(sender, repo, config), handle)
    }

    pub(crate) fn from_parts(
        sender: mpsc::Sender<AuditLogEntry>,
        repo: Arc<dyn AuditLogRepository>,
        config: &AuditConfig,
    ) -> Self {
        Self {
            sender,
            repo,
            policy: config.overflow_policy,
            block_timeout: Duration::from_millis(config.block_timeout_ms),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues an entry for writing. Never fails.
    ///
    /// Under `drop_newest` this returns immediately; under
    /// `block_with_timeout` it waits at most `block_timeout_ms`.
    pub async fn record(&self, entry: AuditLogEntry) {
        let rejected = match self.policy {
            AuditOverflowPolicy::DropNewest => match self.sender.try_send(entry) {
                Ok(()) => None,
                Err(TrySendError::Full(entry)) => Some((entry, "queue full")),
                Err(TrySendError::Closed(entry)) => Some((entry, "trail closed")),
            },
            AuditOverflowPolicy::BlockWithTimeout => {
                match self.sender.send_timeout(entry, self.block_timeout).await {
                    Ok(()) => None,
                    Err(SendTimeoutError::Timeout(entry)) => Some((entry, "queue full")),
                    Err(SendTimeoutError::Closed(entry)) => Some((entry, "trail closed")),
                }
            }
        };

        if let Some((entry, reason)) = rejected {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                audit_id = %entry.id,
                action = %entry.action,
                resource = %entry.resource,
                reason = %reason,
                dropped_total = total,
                "Dropping audit entry"
            );
        }
    }

    /// Entries matching `filter`, oldest first.
    pub async fn query(
        &self,
        filter: &AuditQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        self.repo.search(filter, page).await
    }

    /// How many entries have been dropped since start.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_database::memory::MemoryAuditLogRepository;
    use adminhub_entity::audit::{actions, resources};
    use std::time::Instant;

    fn entry() -> AuditLogEntry {
        AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH)
    }

    #[tokio::test]
    async fn test_drop_newest_counts_overflow() {
        let (tx, _rx) = mpsc::channel(2);
        let trail = AuditTrail::from_parts(
            tx,
            Arc::new(MemoryAuditLogRepository::new()),
            &AuditConfig::default(),
        );

        for _ in 0..5 {
            trail.record(entry()).await;
        }
        assert_eq!(trail.dropped_count(), 3);
    }

    #[tokio::test]
    async fn test_block_with_timeout_waits_then_drops() {
        let (tx, _rx) = mpsc::channel(1);
        let config = AuditConfig {
            overflow_policy: AuditOverflowPolicy::BlockWithTimeout,
            block_timeout_ms: 20,
            ..AuditConfig::default()
        };
        let trail =
            AuditTrail::from_parts(tx, Arc::new(MemoryAuditLogRepository::new()), &config);

        trail.record(entry()).await;
        let started = Instant::now();
        trail.record(entry()).await;
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(trail.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_trail_drops() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let trail = AuditTrail::from_parts(
            tx,
            Arc::new(MemoryAuditLogRepository::new()),
            &AuditConfig::default(),
        );
        trail.record(entry()).await;
        assert_eq!(trail.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_recorded_entries_are_queryable_in_order() {
        let repo = Arc::new(MemoryAuditLogRepository::new());
        let (trail, handle) = AuditTrail::start(repo.clone(), &AuditConfig::default());

        let first = AuditLogEntry::new("user.update", "user").resource_id("u-1");
        let second = AuditLogEntry::new("user.delete", "user").resource_id("u-1");
        trail.record(first.clone()).await;
        trail.record(second.clone()).await;
        handle.shutdown().await;

        let page = trail
            .query(
                &AuditQuery {
                    resource: Some("user".into()),
                    resource_id: Some("u-1".into()),
                    ..Default::default()
                },
                &PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.items, vec![first, second]);
    }
}
