//! # adminhub-auth
//!
//! The authentication core for AdminHub: credential verification, token
//! issuance and rotation, session revocation, permission resolution from
//! roles, and asynchronous security audit recording.
//!
//! ## Modules
//!
//! - `credential`: username/password verification
//! - `password`: Argon2id password hashing
//! - `rbac`: role to permission-set resolution and enforcement
//! - `jwt`: access/refresh token signing and validation
//! - `session`: refresh-token session lifecycle
//! - `audit`: bounded, non-blocking audit trail
//! - `orchestrator`: the login, refresh, logout, and logout-all flows

pub mod audit;
pub mod credential;
pub mod jwt;
pub mod orchestrator;
pub mod password;
pub mod rbac;
pub mod session;

pub use audit::{AuditTrail, AuditWorkerHandle};
pub use credential::CredentialVerifier;
pub use jwt::{AccessClaims, RefreshClaims, TokenIssuer};
pub use orchestrator::{AuthOrchestrator, ClientContext, LoginOutcome, RefreshOutcome, TokenPair};
pub use password::PasswordHasher;
pub use rbac::{PermissionResolver, PermissionSet, RbacEnforcer};
pub use session::SessionStore;
