//! In-memory session store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_entity::session::{NewSession, Session};

use crate::repositories::SessionRepository;

/// DashMap-backed [`SessionRepository`].
///
/// Conditional revocation holds the shard write lock for the key, so two
/// concurrent revokes of one token cannot both succeed.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionRepository {
    sessions: Arc<DashMap<String, Session>>,
}

impl MemorySessionRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, revoked ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: NewSession, created_at: DateTime<Utc>) -> AppResult<Session> {
        match self.sessions.entry(session.token_id.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("Session token ID collision")),
            Entry::Vacant(slot) => {
                let session = Session::from_new(session, created_at);
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn find_by_token_id(&self, token_id: &str) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(token_id).map(|s| s.clone()))
    }

    async fn revoke(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut session) = self.sessions.get_mut(token_id) else {
            return Ok(false);
        };
        if session.revoked {
            return Ok(false);
        }
        session.revoked = true;
        session.revoked_at = Some(at);
        Ok(true)
    }

    async fn consume(&self, token_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut session) = self.sessions.get_mut(token_id) else {
            return Ok(false);
        };
        if session.revoked {
            return Ok(false);
        }
        session.revoked = true;
        session.revoked_at = Some(at);
        session.rotated = true;
        Ok(true)
    }

    async fn revoke_all_by_user(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let mut count = 0;
        for mut session in self.sessions.iter_mut() {
            if session.user_id == user_id && !session.revoked {
                session.revoked = true;
                session.revoked_at = Some(at);
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_core::ErrorKind;
    use chrono::Duration;

    fn new_session(token_id: &str, user_id: Uuid) -> NewSession {
        NewSession {
            token_id: token_id.into(),
            user_id,
            expires_at: Utc::now() + Duration::days(7),
            ip_address: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_token_id_collision_conflicts() {
        let repo = MemorySessionRepository::new();
        let user = Uuid::new_v4();
        repo.create(new_session("t1", user), Utc::now()).await.unwrap();
        let err = repo
            .create(new_session("t1", user), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_reports_first_caller_only() {
        let repo = MemorySessionRepository::new();
        repo.create(new_session("t1", Uuid::new_v4()), Utc::now())
            .await
            .unwrap();

        assert!(repo.revoke("t1", Utc::now()).await.unwrap());
        assert!(!repo.revoke("t1", Utc::now()).await.unwrap());
        assert!(!repo.revoke("missing", Utc::now()).await.unwrap());

        let stored = repo.find_by_token_id("t1").await.unwrap().unwrap();
        assert!(stored.revoked);
        assert!(stored.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_consume_marks_rotation() {
        let repo = MemorySessionRepository::new();
        repo.create(new_session("t1", Uuid::new_v4()), Utc::now())
            .await
            .unwrap();
        repo.create(new_session("t2", Uuid::new_v4()), Utc::now())
            .await
            .unwrap();

        assert!(repo.consume("t1", Utc::now()).await.unwrap());
        assert!(!repo.consume("t1", Utc::now()).await.unwrap());
        assert!(repo.find_by_token_id("t1").await.unwrap().unwrap().rotated);

        repo.revoke("t2", Utc::now()).await.unwrap();
        assert!(!repo.consume("t2", Utc::now()).await.unwrap());
        assert!(!repo.find_by_token_id("t2").await.unwrap().unwrap().rotated);
    }

    #[tokio::test]
    async fn test_revoke_all_only_touches_owner() {
        let repo = MemorySessionRepository::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        repo.create(new_session("a1", alice), Utc::now()).await.unwrap();
        repo.create(new_session("a2", alice), Utc::now()).await.unwrap();
        repo.create(new_session("b1", bob), Utc::now()).await.unwrap();
        repo.revoke("a1", Utc::now()).await.unwrap();

        assert_eq!(repo.revoke_all_by_user(alice, Utc::now()).await.unwrap(), 1);
        assert!(!repo.find_by_token_id("b1").await.unwrap().unwrap().revoked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_revoke_has_single_winner() {
        let repo = MemorySessionRepository::new();
        repo.create(new_session("race", Uuid::new_v4()), Utc::now())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.revoke("race", Utc::now()).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
