//! Role and permission entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use adminhub_core::AppError;

/// A named role. Users reference roles by name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: Uuid,
    /// Unique role name (e.g. `"admin"`, `"manager"`).
    pub name: String,
    /// Optional description shown in admin tooling.
    pub description: Option<String>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

/// A single grantable capability named `resource:action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: Uuid,
    /// Full name, `resource:action`.
    pub name: String,
    /// Resource half of the name.
    pub resource: String,
    /// Action half of the name.
    pub action: String,
}

impl Permission {
    /// Builds a permission from its `resource:action` name.
    pub fn from_name(id: Uuid, name: &str) -> Result<Self, AppError> {
        let (resource, action) = split_permission_name(name)?;
        Ok(Self {
            id,
            name: name.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }
}

/// Join row granting a permission to a role.
///
/// `(role_id, permission_id)` is a composite unique key; deleting either
/// side cascades to the grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    /// The role receiving the grant.
    pub role_id: Uuid,
    /// The permission granted.
    pub permission_id: Uuid,
}

/// Splits `resource:action`, rejecting empty halves and extra separators.
pub fn split_permission_name(name: &str) -> Result<(&str, &str), AppError> {
    match name.split_once(':') {
        Some((resource, action))
            if !resource.is_empty() && !action.is_empty() && !action.contains(':') =>
        {
            Ok((resource, action))
        }
        _ => Err(AppError::validation(format!(
            "Invalid permission name '{name}': expected 'resource:action'"
        ))),
    }
}
