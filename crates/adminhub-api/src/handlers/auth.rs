//! Auth handlers: login, refresh, logout, logout-all, me.
//!
//! The refresh token never appears in a response body. It is set as an
//! HttpOnly cookie scoped to the auth routes and rotated on every refresh.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use tracing::warn;

use adminhub_core::config::SessionConfig;
use adminhub_core::error::{AppError, ErrorKind};

use crate::dto::request::{LoginRequest, validate_body};
use crate::dto::response::{
    LoginResponse, LogoutAllResponse, MeResponse, MessageResponse, RefreshResponse, UserResponse,
};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo};
use crate::handlers::flow::run_flow;
use crate::state::AppState;

const TOKEN_TYPE: &str = "Bearer";

/// Cookie carrying `token` for the lifetime of its session.
fn refresh_cookie(
    config: &SessionConfig,
    token: String,
    expires_at: DateTime<Utc>,
    max_age_secs: i64,
) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path(config.cookie_path.clone())
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age_secs))
        .expires(time::OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).ok())
        .build()
}

/// Cookie that tells the browser to forget the refresh token.
fn cleared_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), ""))
        .path(config.cookie_path.clone())
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}

fn presented_refresh_token(jar: &CookieJar, config: &SessionConfig) -> Option<String> {
    jar.get(&config.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether a failed refresh means the cookie can never work again.
fn is_dead_token(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TokenInvalid
            | ErrorKind::TokenExpired
            | ErrorKind::TokenRevoked
            | ErrorKind::TokenReuseDetected
            | ErrorKind::NotFound
            | ErrorKind::AccountInactive
    )
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    validate_body(&req)?;

    let auth = state.auth.clone();
    let outcome = run_flow(state.flow_timeout(), move |cancel| async move {
        auth.login(&req.username, &req.password, &client, &cancel)
            .await
    })
    .await?;

    let tokens = outcome.tokens;
    let jar = jar.add(refresh_cookie(
        &state.config.session,
        tokens.refresh_token,
        tokens.refresh_expires_at,
        state.auth.issuer().refresh_ttl_seconds(),
    ));

    Ok((
        jar,
        Json(LoginResponse {
            access_token: tokens.access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_at: tokens.access_expires_at,
            user: UserResponse::new(&outcome.user, outcome.permissions),
        }),
    ))
}

/// POST /auth/refresh
///
/// A refresh token that can never succeed again is cleared from the
/// browser along with the error response.
pub async fn refresh(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    jar: CookieJar,
) -> Response {
    let session_config = &state.config.session;
    let Some(token) = presented_refresh_token(&jar, session_config) else {
        return ApiError(AppError::token_invalid("Missing refresh token")).into_response();
    };

    let auth = state.auth.clone();
    let result = run_flow(state.flow_timeout(), move |cancel| async move {
        auth.refresh(&token, &client, &cancel).await
    })
    .await;

    match result {
        Ok(outcome) => {
            let tokens = outcome.tokens;
            let jar = jar.add(refresh_cookie(
                session_config,
                tokens.refresh_token,
                tokens.refresh_expires_at,
                state.auth.issuer().refresh_ttl_seconds(),
            ));
            let body = RefreshResponse {
                access_token: tokens.access_token,
                token_type: TOKEN_TYPE.to_string(),
                expires_at: tokens.access_expires_at,
            };
            (jar, Json(body)).into_response()
        }
        Err(e) if is_dead_token(e.kind) => {
            (jar.add(cleared_cookie(session_config)), ApiError(e)).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST /auth/logout
///
/// Always succeeds and always clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(token) = presented_refresh_token(&jar, &state.config.session) {
        let auth = state.auth.clone();
        let result = run_flow(state.flow_timeout(), move |cancel| async move {
            auth.logout(&token, &client, &cancel).await;
            Ok(())
        })
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Logout flow did not complete");
        }
    }

    (
        jar.add(cleared_cookie(&state.config.session)),
        Json(MessageResponse::new("Logged out")),
    )
}

/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ClientInfo(client): ClientInfo,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutAllResponse>), ApiError> {
    let user_id = auth_user.user_id();
    let auth = state.auth.clone();
    let revoked = run_flow(state.flow_timeout(), move |cancel| async move {
        auth.logout_all(user_id, &client, &cancel).await
    })
    .await?;

    Ok((
        jar.add(cleared_cookie(&state.config.session)),
        Json(LogoutAllResponse {
            message: "Logged out of all sessions".to_string(),
            revoked_sessions: revoked,
        }),
    ))
}

/// GET /auth/me
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse::from(auth_user.claims()))
}
