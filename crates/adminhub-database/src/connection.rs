//! PostgreSQL connection pool management.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use adminhub_core::config::DatabaseConfig;
use adminhub_core::error::{AppError, ErrorKind};

use crate::migration;
use crate::repositories::{
    PgAuditLogRepository, PgPermissionRepository, PgSessionRepository, PgUserRepository,
};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

/// The PostgreSQL repositories sharing one pool.
#[derive(Debug, Clone)]
pub struct PgRepositories {
    pub users: Arc<PgUserRepository>,
    pub permissions: Arc<PgPermissionRepository>,
    pub sessions: Arc<PgSessionRepository>,
    pub audit_logs: Arc<PgAuditLogRepository>,
}

impl DatabasePool {
    /// Connect using `config`, applying migrations when `run_migrations` is set.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        if config.run_migrations {
            migration::run_migrations(&pool).await?;
        }

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build every repository on top of this pool.
    pub fn repositories(&self) -> PgRepositories {
        PgRepositories {
            users: Arc::new(PgUserRepository::new(self.pool.clone())),
            permissions: Arc::new(PgPermissionRepository::new(self.pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(self.pool.clone())),
            audit_logs: Arc::new(PgAuditLogRepository::new(self.pool.clone())),
        }
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url.rfind('@') {
        Some(at) if at > scheme_end => match url[scheme_end..at].find(':') {
            Some(colon) => format!("{}:****{}", &url[..scheme_end + colon], &url[at..]),
            None => url.to_string(),
        },
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://admin:s3cr@t@db:5432/adminhub"),
            "postgres://admin:****@db:5432/adminhub"
        );
        assert_eq!(
            mask_password("postgres://admin@db:5432/adminhub"),
            "postgres://admin@db:5432/adminhub"
        );
        assert_eq!(
            mask_password("postgres://db:5432/adminhub"),
            "postgres://db:5432/adminhub"
        );
    }
}
