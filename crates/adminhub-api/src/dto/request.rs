//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use adminhub_core::error::AppError;
use adminhub_core::types::pagination::PageRequest;
use adminhub_entity::audit::AuditQuery;

use crate::extractors::PaginationParams;

/// Login request body.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, max = 255, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, max = 1024, message = "Password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Runs `validator` rules, mapping failures to a validation error.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

/// Query string for `GET /audit-logs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogParams {
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Action name, e.g. `login_failed`.
    pub action: Option<String>,
    /// Resource type.
    pub resource: Option<String>,
    /// Resource identifier.
    pub resource_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page.
    pub page_size: Option<u64>,
}

impl AuditLogParams {
    /// Splits into a filter and a page request.
    pub fn into_query(self) -> Result<(AuditQuery, PageRequest), AppError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::validation("'from' must not be after 'to'"));
            }
        }

        let page = PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
        .into_page_request();

        let filter = AuditQuery {
            user_id: self.user_id,
            action: self.action,
            resource: self.resource,
            resource_id: self.resource_id,
            from: self.from,
            to: self.to,
        };
        Ok((filter, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_requires_fields() {
        let req = LoginRequest {
            username: String::new(),
            password: "secret".into(),
        };
        let err = validate_body(&req).unwrap_err();
        assert!(err.is(adminhub_core::ErrorKind::Validation));
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let req = LoginRequest {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{req:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_audit_params_reject_inverted_range() {
        let now = Utc::now();
        let params = AuditLogParams {
            from: Some(now),
            to: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn test_audit_params_default_page() {
        let (filter, page) = AuditLogParams {
            action: Some("logout".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(filter.action.as_deref(), Some("logout"));
        assert_eq!(page, PageRequest::default());
    }
}
