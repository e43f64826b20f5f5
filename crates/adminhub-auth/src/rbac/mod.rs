//! Role-based access control: resolving a role to its permission set and
//! enforcing permissions carried in access-token claims.

pub mod enforcer;
pub mod resolver;

pub use enforcer::RbacEnforcer;
pub use resolver::{PermissionResolver, PermissionSet};
