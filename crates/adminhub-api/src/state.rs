//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use adminhub_auth::{AuthOrchestrator, RbacEnforcer};
use adminhub_core::config::AppConfig;
use adminhub_database::DatabasePool;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Login, refresh, and logout flows
    pub auth: AuthOrchestrator,
    /// Permission checks on access-token claims
    pub enforcer: RbacEnforcer,
    /// PostgreSQL pool, absent when running on in-memory stores
    pub database: Option<DatabasePool>,
}

impl AppState {
    /// Creates a state without a database pool.
    pub fn new(config: Arc<AppConfig>, auth: AuthOrchestrator) -> Self {
        Self {
            config,
            auth,
            enforcer: RbacEnforcer::new(),
            database: None,
        }
    }

    /// Attaches the pool used by the health endpoint.
    pub fn with_database(mut self, database: DatabasePool) -> Self {
        self.database = Some(database);
        self
    }

    /// Upper bound on a single auth flow.
    pub fn flow_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.flow_timeout_seconds)
    }
}
