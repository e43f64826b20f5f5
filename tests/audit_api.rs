//! HTTP-level tests for the audit read endpoint and health check.

mod common;

use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn test_audit_logs_require_permission() {
    let app = TestApp::new().await;
    let (mike, _) = app.login_ok("mike").await;

    let response = app.request("GET", "/audit-logs", None, Some(&mike), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "PERMISSION_DENIED");

    let anonymous = app.request("GET", "/audit-logs", None, None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_audit_logs_filter_by_action() {
    let app = TestApp::new().await;
    app.login("alice", "wrong").await;
    app.login("mike", "wrong").await;
    let (alice, _) = app.login_ok("alice").await;
    app.wait_for_audit("login_success").await;

    let response = app
        .request(
            "GET",
            "/audit-logs?action=login_failed&page_size=10",
            None,
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|e| e["action"] == "login_failed"));
    assert_eq!(items[0]["changes"]["username"], "alice");
    assert_eq!(items[1]["changes"]["username"], "mike");
    assert_eq!(response.body["total_items"], 2);
    assert_eq!(response.body["page_size"], 10);
}

#[tokio::test]
async fn test_audit_logs_paginate_in_creation_order() {
    let app = TestApp::new().await;
    for _ in 0..3 {
        app.login("nobody", "wrong").await;
    }
    let (alice, _) = app.login_ok("alice").await;
    app.wait_for_audit("login_success").await;

    let page = app
        .request(
            "GET",
            "/audit-logs?page=2&page_size=2",
            None,
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["total_items"], 4);
    assert_eq!(page.body["total_pages"], 2);

    let items = page.body["items"].as_array().unwrap();
    assert_eq!(items[0]["action"], "login_failed");
    assert_eq!(items[1]["action"], "login_success");
}

#[tokio::test]
async fn test_audit_logs_tolerate_huge_page_number() {
    let app = TestApp::new().await;
    let (alice, _) = app.login_ok("alice").await;
    app.wait_for_audit("login_success").await;

    let response = app
        .request(
            "GET",
            "/audit-logs?page=18446744073709551615&page_size=500",
            None,
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["items"].as_array().unwrap().is_empty());
    assert_eq!(response.body["total_items"], 1);
}

#[tokio::test]
async fn test_audit_logs_reject_inverted_range() {
    let app = TestApp::new().await;
    let (alice, _) = app.login_ok("alice").await;

    let response = app
        .request(
            "GET",
            "/audit-logs?from=2026-02-01T00:00:00Z&to=2026-01-01T00:00:00Z",
            None,
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_health_without_database() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None, None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert!(response.body.get("database").is_none());
    assert_eq!(response.body["audit_dropped"], 0);
}

#[tokio::test]
async fn test_audit_queue_drains_on_shutdown() {
    let mut app = TestApp::new().await;
    app.login_ok("alice").await;
    app.login("alice", "wrong").await;

    let entries = app.drain_audit().await;
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["login_success", "login_failed"]);
}
