//! HTTP-level tests for the login, refresh, logout, and logout-all flows.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{PASSWORD, TestApp};

#[tokio::test]
async fn test_login_success_sets_refresh_cookie() {
    let app = TestApp::new().await;
    let response = app.login("alice", PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["access_token"].as_str().is_some());
    assert!(response.body.get("refresh_token").is_none());
    assert_eq!(response.body["token_type"], "Bearer");
    assert_eq!(response.body["user"]["username"], "alice");
    assert_eq!(
        response.body["user"]["permissions"],
        json!(["audit:read", "users:read", "users:write"])
    );

    let cookie = response.cookie_header("refresh_token").unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/auth"));
    assert!(cookie.contains("Max-Age=604800"));
    assert_eq!(app.sessions.len(), 1);

    let entry = app.wait_for_audit("login_success").await;
    assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(entry.user_agent.as_deref(), Some("integration-test"));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_identical() {
    let app = TestApp::new().await;

    let wrong = app.login("alice", "wrong").await;
    let unknown = app.login("nobody", "wrong").await;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
    assert_eq!(wrong.error_code(), "AUTH_FAILED");
    assert!(wrong.set_cookies.is_empty());
    assert!(app.sessions.is_empty());

    let entry = app.wait_for_audit("login_failed").await;
    assert_eq!(entry.resource, "auth");
}

#[tokio::test]
async fn test_suspended_account_is_forbidden() {
    let app = TestApp::new().await;
    let response = app.login("sam", PASSWORD).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "ACCOUNT_INACTIVE");
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_empty_username_is_rejected() {
    let app = TestApp::new().await;
    let response = app.login("", PASSWORD).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_refresh_rotates_cookie_and_old_token_is_revoked() {
    let app = TestApp::new().await;
    let (_, t0) = app.login_ok("alice").await;

    let first = app.request("POST", "/auth/refresh", None, None, Some(&t0)).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert!(first.body["access_token"].as_str().is_some());
    let t1 = first.refresh_cookie().unwrap();
    assert_ne!(t0, t1);

    let replay = app.request("POST", "/auth/refresh", None, None, Some(&t0)).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.error_code(), "TOKEN_REVOKED");
    let cleared = replay.cookie_header("refresh_token").unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let next = app.request("POST", "/auth/refresh", None, None, Some(&t1)).await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = TestApp::new().await;
    let response = app.request("POST", "/auth/refresh", None, None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = TestApp::new().await;
    let (access, _) = app.login_ok("alice").await;

    let response = app
        .request("POST", "/auth/refresh", None, None, Some(&access))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let app = TestApp::new().await;
    let (_, t0) = app.login_ok("alice").await;

    let logout = app.request("POST", "/auth/logout", None, None, Some(&t0)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.cookie_header("refresh_token").unwrap().contains("Max-Age=0"));

    let refresh = app.request("POST", "/auth/refresh", None, None, Some(&t0)).await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(refresh.error_code(), "TOKEN_REVOKED");

    app.wait_for_audit("logout").await;
}

#[tokio::test]
async fn test_logout_always_succeeds() {
    let app = TestApp::new().await;

    let no_cookie = app.request("POST", "/auth/logout", None, None, None).await;
    assert_eq!(no_cookie.status, StatusCode::OK);

    let garbage = app
        .request("POST", "/auth/logout", None, None, Some("not-a-jwt"))
        .await;
    assert_eq!(garbage.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let app = TestApp::new().await;
    let (access, t_laptop) = app.login_ok("alice").await;
    let (_, t_phone) = app.login_ok("alice").await;
    let (_, t_mike) = app.login_ok("mike").await;

    let response = app
        .request("POST", "/auth/logout-all", None, Some(&access), None)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["revoked_sessions"], 2);

    for token in [&t_laptop, &t_phone] {
        let refresh = app.request("POST", "/auth/refresh", None, None, Some(token)).await;
        assert_eq!(refresh.error_code(), "TOKEN_REVOKED");
    }

    let other_user = app
        .request("POST", "/auth/refresh", None, None, Some(&t_mike))
        .await;
    assert_eq!(other_user.status, StatusCode::OK);

    let entry = app.wait_for_audit("logout_all").await;
    assert_eq!(entry.changes.unwrap()["revoked_sessions"], 2);
}

#[tokio::test]
async fn test_logout_all_requires_access_token() {
    let app = TestApp::new().await;
    let response = app.request("POST", "/auth/logout-all", None, None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn test_me_reflects_access_token() {
    let app = TestApp::new().await;
    let (access, _) = app.login_ok("mike").await;

    let response = app.request("GET", "/auth/me", None, Some(&access), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "mike");
    assert_eq!(response.body["role"], "manager");
    assert_eq!(response.body["permissions"], json!(["users:read"]));
}

#[tokio::test]
async fn test_permission_grant_applies_on_next_refresh() {
    use adminhub_database::PermissionRepository;

    let app = TestApp::new().await;
    let (a0, t0) = app.login_ok("mike").await;

    app.permissions.grant("manager", "reports:export").await.unwrap();

    let stale = app.request("GET", "/auth/me", None, Some(&a0), None).await;
    assert_eq!(stale.body["permissions"], json!(["users:read"]));

    let refreshed = app.request("POST", "/auth/refresh", None, None, Some(&t0)).await;
    let access = refreshed.body["access_token"].as_str().unwrap().to_string();
    let me = app.request("GET", "/auth/me", None, Some(&access), None).await;
    assert_eq!(me.body["permissions"], json!(["reports:export", "users:read"]));
}
