//! Role to permission-set resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use adminhub_core::result::AppResult;
use adminhub_database::repositories::PermissionRepository;

/// An ordered, duplicate-free set of `resource:action` names.
pub type PermissionSet = BTreeSet<String>;

/// Resolves a role name to the permissions granted to it.
///
/// The result is read at issuance time and frozen into the access token,
/// so grant changes reach a user on their next login or refresh.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    permissions: Arc<dyn PermissionRepository>,
}

impl PermissionResolver {
    /// Creates a resolver over the given permission store.
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { permissions }
    }

    /// Permissions for `role_name`. Unknown roles resolve to an empty set.
    pub async fn resolve(&self, role_name: &str) -> AppResult<PermissionSet> {
        let names = self.permissions.permissions_for_role(role_name).await?;
        let set: PermissionSet = names.into_iter().collect();
        debug!(role = %role_name, count = set.len(), "Resolved role permissions");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_database::memory::MemoryPermissionRepository;

    #[tokio::test]
    async fn test_resolve_is_deterministic() {
        let repo = MemoryPermissionRepository::new();
        repo.create_role("admin", None).await.unwrap();
        for name in ["users:write", "audit:read", "users:read"] {
            repo.create_permission(name).await.unwrap();
            repo.grant("admin", name).await.unwrap();
        }
        let resolver = PermissionResolver::new(Arc::new(repo));

        let perms: Vec<_> = resolver.resolve("admin").await.unwrap().into_iter().collect();
        assert_eq!(perms, vec!["audit:read", "users:read", "users:write"]);
    }

    #[tokio::test]
    async fn test_unknown_role_resolves_empty() {
        let resolver = PermissionResolver::new(Arc::new(MemoryPermissionRepository::new()));
        assert!(resolver.resolve("nobody").await.unwrap().is_empty());
    }
}
