//! Role and permission repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use adminhub_core::error::{AppError, ErrorKind};
use adminhub_core::result::AppResult;
use adminhub_entity::role::{Permission, Role};

use super::map_write_error;

/// Role, permission, and role-permission grant storage.
#[async_trait]
pub trait PermissionRepository: Send + Sync + std::fmt::Debug {
    /// Names of every permission granted to the named role.
    ///
    /// An unknown role yields an empty list.
    async fn permissions_for_role(&self, role_name: &str) -> AppResult<Vec<String>>;

    /// Create a role. Fails with `Conflict` if the name is taken.
    async fn create_role(&self, name: &str, description: Option<&str>) -> AppResult<Role>;

    /// Delete a role; its grants go with it.
    async fn delete_role(&self, name: &str) -> AppResult<()>;

    /// Create a `resource:action` permission. Fails with `Conflict` if it exists.
    async fn create_permission(&self, name: &str) -> AppResult<Permission>;

    /// Grant a permission to a role. Returns `false` if it was already granted.
    async fn grant(&self, role_name: &str, permission_name: &str) -> AppResult<bool>;

    /// Remove a grant. Returns `false` if there was nothing to remove.
    async fn revoke(&self, role_name: &str, permission_name: &str) -> AppResult<bool>;
}

/// PostgreSQL-backed [`PermissionRepository`].
#[derive(Debug, Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_and_permission_ids(
        &self,
        role_name: &str,
        permission_name: &str,
    ) -> AppResult<(Uuid, Uuid)> {
        let row: Option<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
            "SELECT (SELECT id FROM roles WHERE name = $1), \
                    (SELECT id FROM permissions WHERE name = $2)",
        )
        .bind(role_name)
        .bind(permission_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to look up role/permission", e)
        })?;

        match row {
            Some((Some(role_id), Some(permission_id))) => Ok((role_id, permission_id)),
            Some((None, _)) | None => Err(AppError::not_found(format!(
                "Role '{role_name}' not found"
            ))),
            Some((_, None)) => Err(AppError::not_found(format!(
                "Permission '{permission_name}' not found"
            ))),
        }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn permissions_for_role(&self, role_name: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT p.name FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN roles r ON r.id = rp.role_id \
             WHERE r.name = $1 ORDER BY p.name",
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve role permissions", e)
        })
    }

    async fn create_role(&self, name: &str, description: Option<&str>) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "Failed to create role",
                &format!("Role '{name}' already exists"),
            )
        })
    }

    async fn delete_role(&self, name: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete role", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Role '{name}' not found")));
        }
        Ok(())
    }

    async fn create_permission(&self, name: &str) -> AppResult<Permission> {
        let permission = Permission::from_name(Uuid::new_v4(), name)?;
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (id, name, resource, action) VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(permission.id)
        .bind(&permission.name)
        .bind(&permission.resource)
        .bind(&permission.action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "Failed to create permission",
                &format!("Permission '{name}' already exists"),
            )
        })
    }

    async fn grant(&self, role_name: &str, permission_name: &str) -> AppResult<bool> {
        let (role_id, permission_id) = self
            .role_and_permission_ids(role_name, permission_name)
            .await?;

        let result = sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) \
             ON CONFLICT (role_id, permission_id) DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to grant permission", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, role_name: &str, permission_name: &str) -> AppResult<bool> {
        let (role_id, permission_id) = self
            .role_and_permission_ids(role_name, permission_name)
            .await?;

        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(role_id)
                .bind(permission_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to revoke permission", e)
                })?;

        Ok(result.rows_affected() == 1)
    }
}
