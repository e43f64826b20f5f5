//! AdminHub Server: authentication and audit service.
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use adminhub_api::{AppState, build_router};
use adminhub_auth::{
    AuditTrail, AuthOrchestrator, CredentialVerifier, PasswordHasher, PermissionResolver,
    SessionStore, TokenIssuer,
};
use adminhub_core::config::AppConfig;
use adminhub_core::error::{AppError, ErrorKind};
use adminhub_database::DatabasePool;

#[tokio::main]
async fn main() {
    let env = std::env::var("ADMINHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting AdminHub");

    if config.auth.uses_default_secrets() {
        warn!(
            "Token secrets are the built-in defaults; set ADMINHUB__AUTH__ACCESS_TOKEN_SECRET \
             and ADMINHUB__AUTH__REFRESH_TOKEN_SECRET"
        );
    }

    let config = Arc::new(config);

    // Database
    let db = DatabasePool::connect(&config.database).await?;
    let repos = db.repositories();

    // Auth components
    let verifier = CredentialVerifier::new(repos.users.clone(), PasswordHasher::new())?;
    let resolver = PermissionResolver::new(repos.permissions.clone());
    let issuer = Arc::new(TokenIssuer::new(&config.auth));
    let sessions = SessionStore::new(repos.sessions.clone());
    let (audit, audit_worker) = AuditTrail::start(repos.audit_logs.clone(), &config.audit);

    let orchestrator = AuthOrchestrator::new(
        repos.users.clone(),
        verifier,
        resolver,
        issuer,
        sessions,
        audit,
    );

    // HTTP
    let state = AppState::new(Arc::clone(&config), orchestrator).with_database(db.clone());
    let app = build_router(state);

    let addr = config.server.bind_address();
    let served = match TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!(addr = %addr, "AdminHub server listening");
            serve(
                listener,
                app,
                Duration::from_secs(config.server.shutdown_grace_seconds),
            )
            .await
        }
        Err(e) => Err(AppError::with_source(
            ErrorKind::Internal,
            format!("Failed to bind {addr}"),
            e,
        )),
    };

    // Drain the audit queue before the pool goes away.
    audit_worker.shutdown().await;
    db.close().await;

    served?;
    info!("AdminHub server shut down gracefully");
    Ok(())
}

/// Serves until a shutdown signal, then lets in-flight requests finish
/// for at most `grace`.
async fn serve(listener: TcpListener, app: axum::Router, grace: Duration) -> Result<(), AppError> {
    let stop = CancellationToken::new();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(stop.clone().cancelled_owned())
        .into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = shutdown_signal() => {
            info!(grace_secs = grace.as_secs(), "Shutdown signal received, draining connections");
            stop.cancel();
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Grace period elapsed, dropping remaining connections");
                    Ok(())
                }
            }
        }
    };

    result.map_err(|e| AppError::with_source(ErrorKind::Internal, "HTTP server failed", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
