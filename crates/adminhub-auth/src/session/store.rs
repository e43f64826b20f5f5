//! Session storage operations wrapping the session repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_database::repositories::SessionRepository;
use adminhub_entity::session::{NewSession, Session};

/// Create, look up, and revoke refresh-token sessions.
///
/// A session moves `active -> revoked` or `active -> expired`; neither
/// terminal state is ever left.
#[derive(Debug, Clone)]
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Persists a session. Fails with `Conflict` on a token ID collision.
    pub async fn create(&self, session: NewSession) -> AppResult<Session> {
        let session = self.repo.create(session, Utc::now()).await?;
        debug!(
            user_id = %session.user_id,
            token_id = %session.token_id,
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Finds a session by token ID, failing with `NotFound` if absent.
    pub async fn find_by_token_id(&self, token_id: &str) -> AppResult<Session> {
        self.repo
            .find_by_token_id(token_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))
    }

    /// Revokes a session. Revoking an already-revoked or unknown session is a no-op.
    pub async fn revoke(&self, token_id: &str) -> AppResult<()> {
        if self.repo.revoke(token_id, Utc::now()).await? {
            debug!(token_id = %token_id, "Session revoked");
        }
        Ok(())
    }

    /// Atomically revokes a session that must still be active.
    ///
    /// Exactly one caller can consume a given session. A loser whose session
    /// was consumed by another refresh gets `TokenReuseDetected`; one whose
    /// session was revoked by a logout in the meantime gets `TokenRevoked`.
    pub async fn consume(&self, token_id: &str) -> AppResult<()> {
        if self.repo.consume(token_id, Utc::now()).await? {
            return Ok(());
        }
        let session = self.find_by_token_id(token_id).await?;
        if session.rotated {
            warn!(token_id = %token_id, "Refresh token consumed more than once");
            Err(AppError::token_reuse_detected(
                "Refresh token has already been used",
            ))
        } else {
            debug!(token_id = %token_id, "Session revoked before it could be consumed");
            Err(AppError::token_revoked("Refresh token has been revoked"))
        }
    }

    /// Revokes every active session belonging to `user_id`.
    pub async fn revoke_all_by_user_id(&self, user_id: Uuid) -> AppResult<u64> {
        let count = self.repo.revoke_all_by_user(user_id, Utc::now()).await?;
        info!(user_id = %user_id, revoked = count, "Revoked all user sessions");
        Ok(count)
    }

    /// Valid means not revoked and not yet expired.
    pub fn is_valid(&self, session: &Session) -> bool {
        session.is_valid_at(Utc::now())
    }

    /// Maps an unusable session to `TokenRevoked` or `TokenExpired`.
    pub fn ensure_valid(&self, session: &Session, now: DateTime<Utc>) -> AppResult<()> {
        if session.revoked {
            return Err(AppError::token_revoked("Refresh token has been revoked"));
        }
        if session.is_expired_at(now) {
            return Err(AppError::token_expired("Session has expired"));
        }
        Ok(())
    }
}
