//! Login, refresh, logout, and logout-all flows.
//!
//! Every flow takes a [`CancellationToken`]. Cancellation is honoured at
//! each storage await up to the point where the flow commits: the session
//! write for login, the conditional revoke of the old session for refresh.
//! From there the flow runs to completion, so a cancelled call either
//! fails without tokens or returns tokens whose session exists.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use adminhub_core::error::{AppError, ErrorKind};
use adminhub_core::result::AppResult;
use adminhub_database::repositories::UserRepository;
use adminhub_entity::audit::{AuditLogEntry, actions, resources};
use adminhub_entity::session::NewSession;
use adminhub_entity::user::User;

use crate::audit::AuditTrail;
use crate::credential::CredentialVerifier;
use crate::jwt::{IssuedAccess, IssuedRefresh, TokenIssuer};
use crate::rbac::{PermissionResolver, PermissionSet};
use crate::session::SessionStore;

/// Where a request came from, for session rows and audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: User,
    /// The permission snapshot embedded in the access token.
    pub permissions: Vec<String>,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub tokens: TokenPair,
    pub user_id: Uuid,
    pub permissions: Vec<String>,
}

/// What a flow had learned when it failed, for the audit entry.
#[derive(Debug, Default)]
struct FlowSubject {
    user_id: Option<Uuid>,
    token_id: Option<String>,
}

/// Composes verification, permission resolution, token issuance, session
/// storage, and auditing into the authentication flows.
#[derive(Debug, Clone)]
pub struct AuthOrchestrator {
    users: Arc<dyn UserRepository>,
    verifier: CredentialVerifier,
    resolver: PermissionResolver,
    issuer: Arc<TokenIssuer>,
    sessions: SessionStore,
    audit: AuditTrail,
}

/// Races `fut` against cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled("Request was cancelled")),
        result = fut => result,
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        Err(AppError::cancelled("Request was cancelled"))
    } else {
        Ok(())
    }
}

fn expiry(timestamp: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| AppError::internal(format!("Token expiry {timestamp} out of range")))
}

impl AuthOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        users: Arc<dyn UserRepository>,
        verifier: CredentialVerifier,
        resolver: PermissionResolver,
        issuer: Arc<TokenIssuer>,
        sessions: SessionStore,
        audit: AuditTrail,
    ) -> Self {
        Self {
            users,
            verifier,
            resolver,
            issuer,
            sessions,
            audit,
        }
    }

    /// The token issuer, for validating access tokens.
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// The permission resolver.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The audit trail.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    // -- Login --

    /// Verifies credentials and opens a new session.
    ///
    /// Every exit path records `login_success` or `login_failed`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientContext,
        cancel: &CancellationToken,
    ) -> AppResult<LoginOutcome> {
        let mut subject = FlowSubject::default();
        let result = self
            .login_inner(username, password, client, cancel, &mut subject)
            .await;

        let mut entry = match &result {
            Ok(outcome) => {
                info!(user_id = %outcome.user.id, username = %outcome.user.username, "Login successful");
                AuditLogEntry::new(actions::LOGIN_SUCCESS, resources::AUTH)
            }
            Err(e) => {
                info!(username = %username, reason = %e.kind, "Login failed");
                AuditLogEntry::new(actions::LOGIN_FAILED, resources::AUTH)
                    .changes(json!({ "username": username, "reason": e.kind.as_code() }))
            }
        }
        .client(client.ip_address.clone(), client.user_agent.clone());
        if let Some(user_id) = subject.user_id {
            entry = entry.user(user_id).resource_id(user_id.to_string());
        }
        self.audit.record(entry).await;

        result
    }

    async fn login_inner(
        &self,
        username: &str,
        password: &str,
        client: &ClientContext,
        cancel: &CancellationToken,
        subject: &mut FlowSubject,
    ) -> AppResult<LoginOutcome> {
        let user = cancellable(cancel, self.verifier.verify(username, password)).await?;
        subject.user_id = Some(user.id);

        if !user.is_active() {
            return Err(AppError::account_inactive(format!(
                "Account is {}",
                user.status
            )));
        }

        let permissions = cancellable(cancel, self.resolver.resolve(&user.role)).await?;
        ensure_not_cancelled(cancel)?;

        let tokens = self.open_session(&user, &permissions, client).await?;

        if let Err(e) = self.users.update_last_login(user.id, Utc::now()).await {
            warn!(user_id = %user.id, error = %e, "Failed to update last login time");
        }

        Ok(LoginOutcome {
            tokens,
            user,
            permissions: permissions.into_iter().collect(),
        })
    }

    // -- Refresh --

    /// Exchanges a refresh token for a new pair, consuming the old one.
    ///
    /// The old session is revoked with a conditional update before anything
    /// new is issued. A concurrent refresh that loses that race gets
    /// `TokenReuseDetected`, which is always audited; losing it to a logout
    /// gives `TokenRevoked`.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
        cancel: &CancellationToken,
    ) -> AppResult<RefreshOutcome> {
        let mut subject = FlowSubject::default();
        let result = self.rotate(refresh_token, client, cancel, &mut subject).await;

        let entry = match &result {
            Ok(outcome) => {
                info!(user_id = %outcome.user_id, "Token refreshed");
                AuditLogEntry::new(actions::TOKEN_REFRESH, resources::SESSION)
                    .user(outcome.user_id)
                    .changes(json!({ "previous_token_id": subject.token_id }))
            }
            Err(e) if e.is(ErrorKind::TokenReuseDetected) => {
                warn!(
                    user_id = ?subject.user_id,
                    token_id = ?subject.token_id,
                    "Refresh token reuse detected"
                );
                AuditLogEntry::new(actions::TOKEN_REUSE_DETECTED, resources::SESSION)
            }
            Err(e) => {
                debug!(user_id = ?subject.user_id, reason = %e.kind, "Token refresh failed");
                AuditLogEntry::new(actions::TOKEN_REFRESH_FAILED, resources::SESSION)
                    .changes(json!({ "reason": e.kind.as_code() }))
            }
        };
        let mut entry = entry.client(client.ip_address.clone(), client.user_agent.clone());
        if let Some(user_id) = subject.user_id {
            entry = entry.user(user_id);
        }
        if let Some(token_id) = &subject.token_id {
            entry = entry.resource_id(token_id.clone());
        }
        self.audit.record(entry).await;

        result
    }

    async fn rotate(
        &self,
        refresh_token: &str,
        client: &ClientContext,
        cancel: &CancellationToken,
        subject: &mut FlowSubject,
    ) -> AppResult<RefreshOutcome> {
        let claims = self.issuer.validate_refresh(refresh_token)?;
        subject.user_id = Some(claims.sub);
        subject.token_id = Some(claims.token_id.clone());

        let session = cancellable(cancel, self.sessions.find_by_token_id(&claims.token_id)).await?;
        if session.user_id != claims.sub {
            return Err(AppError::token_invalid(
                "Refresh token does not match its session",
            ));
        }
        self.sessions.ensure_valid(&session, Utc::now())?;

        let user = cancellable(cancel, self.users.find_by_id(claims.sub))
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if !user.is_active() {
            return Err(AppError::account_inactive(format!(
                "Account is {}",
                user.status
            )));
        }

        let permissions = cancellable(cancel, self.resolver.resolve(&user.role)).await?;
        ensure_not_cancelled(cancel)?;

        // Commit point: from here on the flow ignores cancellation.
        self.sessions.consume(&claims.token_id).await?;

        let tokens = self
            .open_session(&user, &permissions, client)
            .await
            .inspect_err(|e| {
                error!(
                    user_id = %user.id,
                    error = %e,
                    "Old session consumed but replacement could not be stored"
                );
            })?;

        Ok(RefreshOutcome {
            tokens,
            user_id: user.id,
            permissions: permissions.into_iter().collect(),
        })
    }

    // -- Logout --

    /// Revokes the session behind `refresh_token` if it can be identified.
    ///
    /// Never fails: a malformed, expired, or unknown token still counts as
    /// logged out from the caller's point of view.
    pub async fn logout(
        &self,
        refresh_token: &str,
        client: &ClientContext,
        cancel: &CancellationToken,
    ) {
        let mut entry = AuditLogEntry::new(actions::LOGOUT, resources::SESSION)
            .client(client.ip_address.clone(), client.user_agent.clone());

        match self.issuer.validate_refresh(refresh_token) {
            Ok(claims) => {
                if cancel.is_cancelled() {
                    warn!(user_id = %claims.sub, "Logout cancelled before revoking session");
                } else if let Err(e) = self.sessions.revoke(&claims.token_id).await {
                    warn!(user_id = %claims.sub, error = %e, "Failed to revoke session on logout");
                } else {
                    info!(user_id = %claims.sub, "Logged out");
                }
                entry = entry.user(claims.sub).resource_id(claims.token_id);
            }
            Err(e) => {
                debug!(reason = %e.kind, "Logout with unusable refresh token");
                entry = entry.changes(json!({ "token": e.kind.as_code() }));
            }
        }

        self.audit.record(entry).await;
    }

    /// Revokes every session of `user_id`, returning how many were active.
    pub async fn logout_all(
        &self,
        user_id: Uuid,
        client: &ClientContext,
        cancel: &CancellationToken,
    ) -> AppResult<u64> {
        ensure_not_cancelled(cancel)?;
        let revoked = self.sessions.revoke_all_by_user_id(user_id).await?;

        self.audit
            .record(
                AuditLogEntry::new(actions::LOGOUT_ALL, resources::SESSION)
                    .user(user_id)
                    .client(client.ip_address.clone(), client.user_agent.clone())
                    .changes(json!({ "revoked_sessions": revoked })),
            )
            .await;

        Ok(revoked)
    }

    /// Issues a pair and persists the refresh token's session.
    async fn open_session(
        &self,
        user: &User,
        permissions: &PermissionSet,
        client: &ClientContext,
    ) -> AppResult<TokenPair> {
        let access: IssuedAccess = self.issuer.issue_access(user, permissions)?;
        let refresh: IssuedRefresh = self.issuer.issue_refresh(user.id)?;
        let refresh_expires_at = expiry(refresh.claims.exp)?;

        self.sessions
            .create(NewSession {
                token_id: refresh.claims.token_id.clone(),
                user_id: user.id,
                expires_at: refresh_expires_at,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            })
            .await?;

        Ok(TokenPair {
            access_expires_at: expiry(access.claims.exp)?,
            access_token: access.token,
            refresh_token: refresh.token,
            refresh_expires_at,
        })
    }
}
