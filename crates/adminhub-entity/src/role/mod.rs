//! Roles, permissions, and the explicit join between them.

pub mod model;

pub use model::{Permission, Role, RolePermission};
