//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Action names recorded by the authentication flows.
pub mod actions {
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const TOKEN_REFRESH: &str = "token_refresh";
    pub const TOKEN_REFRESH_FAILED: &str = "token_refresh_failed";
    pub const TOKEN_REUSE_DETECTED: &str = "token_reuse_detected";
    pub const LOGOUT: &str = "logout";
    pub const LOGOUT_ALL: &str = "logout_all";
}

/// Resource names used by the authentication flows.
pub mod resources {
    pub const AUTH: &str = "auth";
    pub const SESSION: &str = "session";
}

/// An immutable audit log entry recording a security-relevant action.
///
/// `id` and `created_at` are assigned when the entry is built, so the
/// recorded time is the time of the event, not of the background write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique, time-ordered entry identifier.
    pub id: Uuid,
    /// The acting user, when known.
    pub user_id: Option<Uuid>,
    /// What happened (e.g. `"login_failed"`, `"user.delete"`).
    pub action: String,
    /// The kind of resource acted upon.
    pub resource: String,
    /// The specific resource acted upon.
    pub resource_id: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// Structured before/after detail.
    pub changes: Option<serde_json::Value>,
    /// When the event occurred.
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Start a new entry for `action` on `resource`.
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: None,
            action: action.into(),
            resource: resource.into(),
            resource_id: None,
            ip_address: None,
            user_agent: None,
            changes: None,
            created_at: Utc::now(),
        }
    }

    /// Set the acting user.
    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the resource identifier.
    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Set the client address and agent.
    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Attach structured change detail.
    pub fn changes(mut self, changes: serde_json::Value) -> Self {
        self.changes = Some(changes);
        self
    }
}

/// Filter for reading the audit trail. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Only entries by this user.
    pub user_id: Option<Uuid>,
    /// Only entries with this action.
    pub action: Option<String>,
    /// Only entries on this resource kind.
    pub resource: Option<String>,
    /// Only entries on this resource identifier.
    pub resource_id: Option<String>,
    /// Entries created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Entries created strictly before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    /// Check whether `entry` satisfies every set field.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.is_none_or(|u| entry.user_id == Some(u))
            && self.action.as_deref().is_none_or(|a| entry.action == a)
            && self.resource.as_deref().is_none_or(|r| entry.resource == r)
            && self
                .resource_id
                .as_deref()
                .is_none_or(|id| entry.resource_id.as_deref() == Some(id))
            && self.from.is_none_or(|from| entry.created_at >= from)
            && self.to.is_none_or(|to| entry.created_at < to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_builder_sets_fields() {
        let user = Uuid::new_v4();
        let entry = AuditLogEntry::new(actions::LOGOUT, resources::SESSION)
            .user(user)
            .resource_id("deadbeef")
            .client(Some("10.0.0.1".into()), Some("curl/8".into()))
            .changes(serde_json::json!({ "revoked": true }));

        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.resource_id.as_deref(), Some("deadbeef"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(entry.changes.is_some());
    }

    #[test]
    fn test_ids_are_time_ordered() {
        let a = AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH);
        let b = AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH);
        assert!(a.id < b.id);
    }

    #[test]
    fn test_query_matching() {
        let user = Uuid::new_v4();
        let entry = AuditLogEntry::new(actions::LOGIN_FAILED, resources::AUTH).user(user);

        assert!(AuditQuery::default().matches(&entry));
        assert!(
            AuditQuery {
                user_id: Some(user),
                action: Some(actions::LOGIN_FAILED.into()),
                ..Default::default()
            }
            .matches(&entry)
        );
        assert!(
            !AuditQuery {
                resource_id: Some("x".into()),
                ..Default::default()
            }
            .matches(&entry)
        );
        assert!(
            !AuditQuery {
                to: Some(entry.created_at),
                ..Default::default()
            }
            .matches(&entry)
        );
        assert!(
            AuditQuery {
                from: Some(entry.created_at - Duration::seconds(1)),
                ..Default::default()
            }
            .matches(&entry)
        );
    }
}
