//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side record of one refresh token.
///
/// Sessions are created on login and on every refresh. The only mutation
/// is revocation; rows are never deleted in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Opaque identifier carried in the refresh token's `token_id` claim.
    pub token_id: String,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// When the refresh token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Whether the session has been revoked (terminal).
    pub revoked: bool,
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Set when a refresh consumed the session rather than a logout.
    pub rotated: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Client IP address at creation.
    pub ip_address: Option<String>,
    /// Client User-Agent at creation.
    pub user_agent: Option<String>,
}

impl Session {
    /// Build a fresh, unrevoked session from creation data.
    pub fn from_new(new: NewSession, created_at: DateTime<Utc>) -> Self {
        Self {
            token_id: new.token_id,
            user_id: new.user_id,
            expires_at: new.expires_at,
            revoked: false,
            revoked_at: None,
            rotated: false,
            created_at,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
        }
    }

    /// Valid means not revoked and not yet expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    /// Check whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Data required to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// Token identifier from the freshly issued refresh token.
    pub token_id: String,
    /// The owning user.
    pub user_id: Uuid,
    /// Matches the refresh token's `exp` claim.
    pub expires_at: DateTime<Utc>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session::from_new(
            NewSession {
                token_id: "abc".into(),
                user_id: Uuid::new_v4(),
                expires_at: now + expires_in,
                ip_address: None,
                user_agent: None,
            },
            now,
        )
    }

    #[test]
    fn test_fresh_session_is_valid() {
        let s = session(Duration::days(7));
        assert!(s.is_valid_at(Utc::now()));
        assert!(!s.revoked);
    }

    #[test]
    fn test_revoked_session_is_invalid() {
        let mut s = session(Duration::days(7));
        s.revoked = true;
        assert!(!s.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let s = session(Duration::days(7));
        assert!(!s.is_valid_at(s.expires_at));
        assert!(s.is_expired_at(s.expires_at));
        assert!(s.is_valid_at(s.expires_at - Duration::seconds(1)));
    }
}
