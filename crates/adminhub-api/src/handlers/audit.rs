//! Audit log read endpoint.

use axum::Json;
use axum::extract::{Query, State};

use adminhub_core::types::pagination::PageResponse;
use adminhub_entity::audit::AuditLogEntry;

use crate::dto::request::AuditLogParams;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Permission required to read the audit trail.
pub const AUDIT_READ: &str = "audit:read";

/// GET /audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AuditLogParams>,
) -> Result<Json<PageResponse<AuditLogEntry>>, ApiError> {
    state.enforcer.require(auth.claims(), AUDIT_READ)?;

    let (filter, page) = params.into_query()?;
    let logs = state.auth.audit().query(&filter, &page).await?;
    Ok(Json(logs))
}
