//! In-memory role/permission store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_entity::role::{Permission, Role, RolePermission};

use crate::repositories::PermissionRepository;

#[derive(Debug, Default)]
struct InnerState {
    roles: HashMap<String, Role>,
    permissions: HashMap<String, Permission>,
    grants: HashSet<RolePermission>,
}

impl InnerState {
    fn grant_key(&self, role_name: &str, permission_name: &str) -> AppResult<RolePermission> {
        let role = self
            .roles
            .get(role_name)
            .ok_or_else(|| AppError::not_found(format!("Role '{role_name}' not found")))?;
        let permission = self.permissions.get(permission_name).ok_or_else(|| {
            AppError::not_found(format!("Permission '{permission_name}' not found"))
        })?;
        Ok(RolePermission {
            role_id: role.id,
            permission_id: permission.id,
        })
    }
}

/// [`PermissionRepository`] guarded by a single Tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionRepository {
    state: Arc<RwLock<InnerState>>,
}

impl MemoryPermissionRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionRepository for MemoryPermissionRepository {
    async fn permissions_for_role(&self, role_name: &str) -> AppResult<Vec<String>> {
        let state = self.state.read().await;
        let Some(role) = state.roles.get(role_name) else {
            return Ok(Vec::new());
        };

        let mut names: Vec<String> = state
            .permissions
            .values()
            .filter(|p| {
                state.grants.contains(&RolePermission {
                    role_id: role.id,
                    permission_id: p.id,
                })
            })
            .map(|p| p.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_role(&self, name: &str, description: Option<&str>) -> AppResult<Role> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(name) {
            return Err(AppError::conflict(format!("Role '{name}' already exists")));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(String::from),
            created_at: Utc::now(),
        };
        state.roles.insert(name.to_string(), role.clone());
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .remove(name)
            .ok_or_else(|| AppError::not_found(format!("Role '{name}' not found")))?;
        state.grants.retain(|g| g.role_id != role.id);
        Ok(())
    }

    async fn create_permission(&self, name: &str) -> AppResult<Permission> {
        let permission = Permission::from_name(Uuid::new_v4(), name)?;
        let mut state = self.state.write().await;
        if state.permissions.contains_key(name) {
            return Err(AppError::conflict(format!(
                "Permission '{name}' already exists"
            )));
        }
        state
            .permissions
            .insert(name.to_string(), permission.clone());
        Ok(permission)
    }

    async fn grant(&self, role_name: &str, permission_name: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let key = state.grant_key(role_name, permission_name)?;
        Ok(state.grants.insert(key))
    }

    async fn revoke(&self, role_name: &str, permission_name: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let key = state.grant_key(role_name, permission_name)?;
        Ok(state.grants.remove(&key))
    }
}
