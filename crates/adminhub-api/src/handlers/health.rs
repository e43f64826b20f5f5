//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => Some("connected"),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                Some("unavailable")
            }
        },
        None => None,
    };

    let healthy = database != Some("unavailable");
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.map(String::from),
        audit_dropped: state.auth.audit().dropped_count(),
    };

    (status, Json(body))
}
