//! Audit log repository.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use adminhub_core::error::{AppError, ErrorKind};
use adminhub_core::result::AppResult;
use adminhub_core::types::pagination::{PageRequest, PageResponse};
use adminhub_entity::audit::{AuditLogEntry, AuditQuery};

use super::map_write_error;

/// Append-only audit log storage.
#[async_trait]
pub trait AuditLogRepository: Send + Sync + std::fmt::Debug {
    /// Append one entry. Fails with `Conflict` if its ID is already stored.
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()>;

    /// Entries matching `query`, oldest first.
    async fn search(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>>;
}

/// PostgreSQL-backed [`AuditLogRepository`].
#[derive(Debug, Clone)]
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditQuery) {
    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = &query.action {
        builder.push(" AND action = ").push_bind(action.clone());
    }
    if let Some(resource) = &query.resource {
        builder.push(" AND resource = ").push_bind(resource.clone());
    }
    if let Some(resource_id) = &query.resource_id {
        builder.push(" AND resource_id = ").push_bind(resource_id.clone());
    }
    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at < ").push_bind(to);
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, user_id, action, resource, resource_id, ip_address, \
             user_agent, changes, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.resource)
        .bind(&entry.resource_id)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.changes)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "Failed to append audit entry",
                &format!("Audit entry {} already exists", entry.id),
            )
        })?;
        Ok(())
    }

    async fn search(
        &self,
        query: &AuditQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs WHERE 1=1");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count audit entries", e)
            })?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM audit_logs WHERE 1=1");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at ASC, id ASC LIMIT ")
            .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let entries = select
            .build_query_as::<AuditLogEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to search audit log", e)
            })?;

        Ok(PageResponse::new(entries, page, total as u64))
    }
}
