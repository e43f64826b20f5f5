//! Permission checks against an access-token snapshot.

use adminhub_core::error::AppError;

use crate::jwt::AccessClaims;

/// Enforces permissions carried in validated access-token claims.
///
/// Checks never consult storage; they see exactly the permissions that
/// were resolved when the token was issued.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbacEnforcer;

impl RbacEnforcer {
    /// Creates a new enforcer.
    pub fn new() -> Self {
        Self
    }

    /// Fails with `PermissionDenied` unless `claims` carry `permission`.
    pub fn require(&self, claims: &AccessClaims, permission: &str) -> Result<(), AppError> {
        if claims.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::permission_denied(format!(
                "Missing required permission '{permission}'"
            )))
        }
    }

}
