//! The single background consumer of the audit queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use adminhub_core::config::AuditConfig;
use adminhub_core::error::ErrorKind;
use adminhub_database::repositories::AuditLogRepository;
use adminhub_entity::audit::AuditLogEntry;

pub(crate) struct AuditWorker {
    receiver: mpsc::Receiver<AuditLogEntry>,
    repo: Arc<dyn AuditLogRepository>,
    max_attempts: u32,
    backoff: Duration,
    shutdown: CancellationToken,
}

impl AuditWorker {
    pub(crate) fn new(
        receiver: mpsc::Receiver<AuditLogEntry>,
        repo: Arc<dyn AuditLogRepository>,
        config: &AuditConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            repo,
            max_attempts: config.max_write_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            shutdown,
        }
    }

    /// Writes entries until every sender is gone or shutdown is requested.
    /// On shutdown the queue is closed and what is already in it is drained.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                next = self.receiver.recv() => match next {
                    Some(entry) => self.write(entry).await,
                    None => break,
                },
                _ = self.shutdown.cancelled() => {
                    self.receiver.close();
                    let mut drained = 0usize;
                    while let Some(entry) = self.receiver.recv().await {
                        self.write(entry).await;
                        drained += 1;
                    }
                    info!(drained, "Audit queue drained");
                    break;
                }
            }
        }
        info!("Audit worker stopped");
    }

    async fn write(&self, entry: AuditLogEntry) {
        for attempt in 1..=self.max_attempts {
            match self.repo.append(&entry).await {
                Ok(()) => return,
                // A previous attempt landed even though it reported failure.
                Err(e) if e.is(ErrorKind::Conflict) => {
                    debug!(audit_id = %entry.id, "Audit entry already stored");
                    return;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        audit_id = %entry.id,
                        attempt,
                        error = %e,
                        "Audit write failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    error!(
                        audit_id = %entry.id,
                        action = %entry.action,
                        resource = %entry.resource,
                        attempts = attempt,
                        error = %e,
                        "Audit write failed, entry dropped"
                    );
                }
            }
        }
    }
}

/// Stops the audit writer.
#[derive(Debug)]
pub struct AuditWorkerHandle {
    shutdown: CancellationToken,
    join: JoinHandle<()>,
    timeout: Duration,
}

impl AuditWorkerHandle {
    pub(crate) fn new(shutdown: CancellationToken, join: JoinHandle<()>, timeout: Duration) -> Self {
        Self {
            shutdown,
            join,
            timeout,
        }
    }

    /// Closes the queue and waits for queued entries to be written, up to
    /// the configured shutdown timeout.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        match tokio::time::timeout(self.timeout, &mut self.join).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Audit worker task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Audit queue did not drain in time, remaining entries lost"
                );
                self.join.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditTrail;
    use adminhub_core::types::pagination::PageRequest;
    use adminhub_database::memory::MemoryAuditLogRepository;
    use adminhub_entity::audit::{AuditQuery, actions, resources};

    fn config() -> AuditConfig {
        AuditConfig {
            max_write_attempts: 3,
            retry_backoff_ms: 1,
            ..AuditConfig::default()
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let repo = Arc::new(MemoryAuditLogRepository::new());
        repo.fail_next(2);
        let (trail, handle) = AuditTrail::start(repo.clone(), &config());

        trail
            .record(AuditLogEntry::new(actions::LOGOUT, resources::SESSION))
            .await;
        handle.shutdown().await;

        assert_eq!(repo.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persistent_failure_drops_entry_and_continues() {
        let repo = Arc::new(MemoryAuditLogRepository::new());
        repo.fail_next(3);
        let (trail, handle) = AuditTrail::start(repo.clone(), &config());

        let lost = AuditLogEntry::new(actions::LOGOUT, resources::SESSION);
        let kept = AuditLogEntry::new(actions::LOGOUT_ALL, resources::SESSION);
        trail.record(lost).await;
        trail.record(kept.clone()).await;
        handle.shutdown().await;

        let stored = trail
            .query(&AuditQuery::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(stored.items, vec![kept]);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_rejects_new_entries() {
        let repo = Arc::new(MemoryAuditLogRepository::new());
        let (trail, handle) = AuditTrail::start(repo.clone(), &config());

        for _ in 0..50 {
            trail
                .record(AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH))
                .await;
        }
        handle.shutdown().await;
        assert_eq!(repo.entries().await.len(), 50);

        trail
            .record(AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH))
            .await;
        assert_eq!(trail.dropped_count(), 1);
        assert_eq!(repo.entries().await.len(), 50);
    }
}
