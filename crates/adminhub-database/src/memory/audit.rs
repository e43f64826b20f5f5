//! In-memory audit log.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_core::types::pagination::{PageRequest, PageResponse};
use adminhub_entity::audit::{AuditLogEntry, AuditQuery};

use crate::repositories::AuditLogRepository;

/// Append-only [`AuditLogRepository`] kept in a vector.
///
/// `fail_next` makes the next N appends fail, for exercising retry paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
    failures: Arc<AtomicU32>,
}

impl MemoryAuditLogRepository {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` appends fail with a database error.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Snapshot of every stored entry in append order.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppError::database("Injected audit write failure"));
        }

        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(AppError::conflict(format!(
                "Audit entry {} already exists",
                entry.id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn search(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        let entries = self.entries.read().await;
        let mut matched: Vec<&AuditLogEntry> = entries.iter().filter(|e| query.matches(e)).collect();
        matched.sort_by_key(|e| (e.created_at, e.id));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(PageResponse::new(items, page, total))
    }
}
