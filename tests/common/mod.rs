//! Shared helpers for HTTP-level tests.
//!
//! The router runs on in-memory repositories so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use adminhub_api::{AppState, build_router};
use adminhub_auth::{
    AuditTrail, AuditWorkerHandle, AuthOrchestrator, CredentialVerifier, PasswordHasher,
    PermissionResolver, SessionStore, TokenIssuer,
};
use adminhub_core::config::{
    AppConfig, AuditConfig, AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig,
    SessionConfig,
};
use adminhub_database::memory::{
    MemoryAuditLogRepository, MemoryPermissionRepository, MemorySessionRepository,
    MemoryUserRepository,
};
use adminhub_database::{PermissionRepository, UserRepository};
use adminhub_entity::audit::AuditLogEntry;
use adminhub_entity::user::{User, UserStatus};

pub const PASSWORD: &str = "correct";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    pub config: Arc<AppConfig>,
    pub users: Arc<MemoryUserRepository>,
    pub permissions: Arc<MemoryPermissionRepository>,
    pub sessions: Arc<MemorySessionRepository>,
    pub audit_log: Arc<MemoryAuditLogRepository>,
    pub audit_worker: Option<AuditWorkerHandle>,
}

/// A response with its body parsed as JSON.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// Every `Set-Cookie` header, verbatim
    pub set_cookies: Vec<String>,
}

impl TestResponse {
    /// The `Set-Cookie` header for `name`, if any.
    pub fn cookie_header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}=");
        self.set_cookies
            .iter()
            .map(String::as_str)
            .find(|c| c.starts_with(&prefix))
    }

    /// Value of the refresh-token cookie set by this response.
    pub fn refresh_cookie(&self) -> Option<String> {
        let header = self.cookie_header("refresh_token")?;
        let value = header.split(';').next()?.trim_start_matches("refresh_token=");
        Some(value.to_string())
    }

    /// Error code of a failed request.
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            trust_forwarded_headers: true,
            ..ServerConfig::default()
        },
        database: DatabaseConfig {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
            idle_timeout_seconds: 1,
            run_migrations: false,
        },
        auth: AuthConfig {
            access_token_secret: "integration-access-secret".into(),
            refresh_token_secret: "integration-refresh-secret".into(),
            ..AuthConfig::default()
        },
        session: SessionConfig::default(),
        audit: AuditConfig::default(),
        logging: LoggingConfig::default(),
    }
}

impl TestApp {
    /// Builds the app with seeded roles and users:
    /// `alice` (admin), `mike` (manager), `sam` (suspended admin).
    pub async fn new() -> Self {
        let config = Arc::new(test_config());
        let hasher = PasswordHasher::with_params(8, 1, 1).unwrap();

        let users = Arc::new(MemoryUserRepository::new());
        let permissions = Arc::new(MemoryPermissionRepository::new());
        let sessions = Arc::new(MemorySessionRepository::new());
        let audit_log = Arc::new(MemoryAuditLogRepository::new());

        for name in ["users:read", "users:write", "audit:read", "reports:export"] {
            permissions.create_permission(name).await.unwrap();
        }
        permissions.create_role("admin", Some("Administrators")).await.unwrap();
        permissions.create_role("manager", None).await.unwrap();
        for name in ["users:read", "users:write", "audit:read"] {
            permissions.grant("admin", name).await.unwrap();
        }
        permissions.grant("manager", "users:read").await.unwrap();

        for (username, role, status) in [
            ("alice", "admin", UserStatus::Active),
            ("mike", "manager", UserStatus::Active),
            ("sam", "admin", UserStatus::Suspended),
        ] {
            let now = Utc::now();
            users
                .create(&User {
                    id: Uuid::new_v4(),
                    username: username.into(),
                    email: Some(format!("{username}@example.com")),
                    password_hash: hasher.hash_password(PASSWORD).unwrap(),
                    display_name: None,
                    role: role.into(),
                    status,
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        let (audit, audit_worker) = AuditTrail::start(audit_log.clone(), &config.audit);
        let auth = AuthOrchestrator::new(
            users.clone(),
            CredentialVerifier::new(users.clone(), hasher).unwrap(),
            PermissionResolver::new(permissions.clone()),
            Arc::new(TokenIssuer::new(&config.auth)),
            SessionStore::new(sessions.clone()),
            audit,
        );

        let router = build_router(AppState::new(Arc::clone(&config), auth));

        Self {
            router,
            config,
            users,
            permissions,
            sessions,
            audit_log,
            audit_worker: Some(audit_worker),
        }
    }

    /// Sends a request through the router.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        bearer: Option<&str>,
        refresh_cookie: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", "203.0.113.7")
            .header("user-agent", "integration-test");

        if body.is_some() {
            req = req.header(CONTENT_TYPE, "application/json");
        }
        if let Some(token) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = refresh_cookie {
            req = req.header(COOKIE, format!("refresh_token={cookie}"));
        }

        let body = body
            .map(|b| Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap_or_else(Body::empty);
        let response = self
            .router
            .clone()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            set_cookies,
        }
    }

    /// Logs in and returns the response.
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/auth/login",
            Some(serde_json::json!({ "username": username, "password": password })),
            None,
            None,
        )
        .await
    }

    /// Logs in with the seeded password and returns `(access_token, refresh_cookie)`.
    pub async fn login_ok(&self, username: &str) -> (String, String) {
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        let access = response.body["access_token"].as_str().unwrap().to_string();
        let refresh = response.refresh_cookie().unwrap();
        (access, refresh)
    }

    /// Waits until an audit entry with `action` has been written.
    pub async fn wait_for_audit(&self, action: &str) -> AuditLogEntry {
        for _ in 0..100 {
            if let Some(entry) = self
                .audit_log
                .entries()
                .await
                .into_iter()
                .find(|e| e.action == action)
            {
                return entry;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("no audit entry with action '{action}' was written");
    }

    /// Drains the audit queue and returns everything written.
    pub async fn drain_audit(&mut self) -> Vec<AuditLogEntry> {
        if let Some(worker) = self.audit_worker.take() {
            worker.shutdown().await;
        }
        self.audit_log.entries().await
    }
}
