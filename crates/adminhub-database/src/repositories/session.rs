//! Session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use adminhub_core::error::{AppError, ErrorKind};
use adminhub_core::result::AppResult;
use adminhub_entity::session::{NewSession, Session};

use super::map_write_error;

/// Refresh-token session storage.
///
/// Revocation is a conditional update: it only touches rows that are not
/// yet revoked and reports whether it did. Concurrent callers revoking the
/// same token therefore see exactly one `true`.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug {
    /// Insert a session. Fails with `Conflict` if the token ID exists.
    async fn create(&self, session: NewSession, created_at: DateTime<Utc>) -> AppResult<Session>;

    /// Find a session by token ID.
    async fn find_by_token_id(&self, token_id: &str) -> AppResult<Option<Session>>;

    /// Revoke one session if it is still unrevoked.
    ///
    /// Returns `true` when this call flipped the flag.
    async fn revoke(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Revoke one session on behalf of a refresh, marking it rotated.
    ///
    /// Same conditional semantics as [`revoke`](Self::revoke).
    async fn consume(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Revoke every unrevoked session of a user, returning how many changed.
    async fn revoke_all_by_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64>;
}

/// PostgreSQL-backed [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: NewSession, created_at: DateTime<Utc>) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (token_id, user_id, expires_at, created_at, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&session.token_id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(created_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create session", "Session token ID collision"))
    }

    async fn find_by_token_id(&self, token_id: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token_id = $1")
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn revoke(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = $2 \
             WHERE token_id = $1 AND revoked = FALSE",
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke session", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn consume(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = $2, rotated = TRUE \
             WHERE token_id = $1 AND revoked = FALSE",
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to consume session", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_by_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = $2 \
             WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke user sessions", e)
        })?;

        Ok(result.rows_affected())
    }
}
