//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adminhub_auth::AccessClaims;
use adminhub_entity::user::User;

/// Returned by `POST /auth/login`. The refresh token travels in a cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token expiration.
    pub expires_at: DateTime<Utc>,
    /// User info.
    pub user: UserResponse,
}

/// Returned by `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token expiration.
    pub expires_at: DateTime<Utc>,
}

/// User summary for responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Email.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Role.
    pub role: String,
    /// Effective permissions.
    pub permissions: Vec<String>,
    /// Last login.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserResponse {
    /// Builds a summary of `user` with its resolved permissions.
    pub fn new(user: &User, permissions: Vec<String>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
            permissions,
            last_login_at: user.last_login_at,
        }
    }
}

/// The caller as seen through their access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Role.
    pub role: String,
    /// Permissions embedded in the token.
    pub permissions: Vec<String>,
    /// Access token expiration.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AccessClaims> for MeResponse {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            id: claims.user_id(),
            username: claims.username.clone(),
            role: claims.role.clone(),
            permissions: claims.permissions.clone(),
            expires_at: claims.expires_at(),
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returned by `POST /auth/logout-all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    /// Message.
    pub message: String,
    /// Sessions that were still active.
    pub revoked_sessions: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Version.
    pub version: String,
    /// Database status, when a database is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Audit entries dropped since start.
    pub audit_dropped: u64,
}
