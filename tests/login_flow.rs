//! Integration tests for the auth HTTP surface.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; client
//! identity comes from `x-forwarded-for` since there is no socket peer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use echo_auth::{
    api::{ApiState, router},
    auth::{AuthSettings, AuthState, RateLimitConfig, SettingsProvider},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

const SECRET: &str = "integration-secret-that-is-at-least-32-bytes";
const PIN: &str = "12345678";

fn app(auth_required: bool, max_attempts: usize) -> Router {
    let pin_hash = bcrypt::hash(PIN, 4).expect("bcrypt hash");
    let settings = AuthSettings::new(
        auth_required,
        Some(SecretString::from(SECRET)),
        Some(SecretString::from(pin_hash)),
        3600,
    )
    .expect("valid settings");
    let auth = AuthState::new(
        Arc::new(SettingsProvider::from(settings)),
        RateLimitConfig {
            max_attempts,
            window: Duration::from_secs(600),
        },
    );
    router(Arc::new(ApiState::new(auth, "test")))
}

fn login_request(body: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn pin_body(pin: &str) -> String {
    json!({ "pin": pin }).to_string()
}

fn session_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/v1/auth/session");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn login_token(app: &Router) -> Result<String> {
    let response = app
        .clone()
        .oneshot(login_request(&pin_body(PIN), "198.51.100.1"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn login_returns_token_and_runtime() -> Result<()> {
    let app = app(true, 10);
    let response = app
        .oneshot(login_request(&pin_body(PIN), "198.51.100.1"))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await?;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["token"].as_str().map(|t| t.split('.').count()), Some(3));
    assert!(body["expires_at"].is_string());
    assert_eq!(body["runtime"]["provider"], json!("auth"));
    assert_eq!(body["runtime"]["env"], json!("test"));
    Ok(())
}

#[tokio::test]
async fn wrong_pin_is_unauthorized() -> Result<()> {
    let response = app(true, 10)
        .oneshot(login_request(&pin_body("wrongpin"), "198.51.100.2"))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error"]["code"], json!("invalid_pin"));
    assert!(body["runtime"]["trace_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_unprocessable_and_not_counted() -> Result<()> {
    let app = app(true, 1);
    for body in ["{}", r#"{"pin": ""}"#, "not json"] {
        let response = app.clone().oneshot(login_request(body, "198.51.100.3")).await?;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        let json = json_body(response).await?;
        assert_eq!(json["error"]["code"], json!("invalid_request"));
    }

    // The single allowed attempt is still available.
    let response = app
        .oneshot(login_request(&pin_body(PIN), "198.51.100.3"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn rate_limit_returns_retry_after() -> Result<()> {
    let app = app(true, 3);
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(login_request(&pin_body("wrongpin"), "203.0.113.9"))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right PIN is refused once the window is full.
    let response = app
        .clone()
        .oneshot(login_request(&pin_body(PIN), "203.0.113.9"))
        .await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    assert!(retry_after.is_some_and(|s| s >= 1));

    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], json!("rate_limit"));
    assert_eq!(body["error"]["retry_after"].as_u64(), retry_after);

    // Other clients are isolated.
    let response = app
        .oneshot(login_request(&pin_body(PIN), "203.0.113.10"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn successful_login_resets_the_window() -> Result<()> {
    let app = app(true, 3);
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(login_request(&pin_body("wrongpin"), "192.0.2.4"))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app
        .clone()
        .oneshot(login_request(&pin_body(PIN), "192.0.2.4"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Three fresh failures are allowed again before the limiter kicks in.
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(login_request(&pin_body("wrongpin"), "192.0.2.4"))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

#[tokio::test]
async fn protected_route_requires_token_when_enforced() -> Result<()> {
    let app = app(true, 10);

    let response = app.clone().oneshot(session_request(None)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], json!("auth_required"));

    let token = login_token(&app).await?;
    let response = app
        .oneshot(session_request(Some(&format!("bearer {token}"))))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["subject"], json!("mrw"));
    Ok(())
}

#[tokio::test]
async fn bad_token_is_rejected_even_when_not_enforced() -> Result<()> {
    let app = app(false, 10);

    let response = app.clone().oneshot(session_request(None)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["authenticated"], json!(false));

    let response = app
        .clone()
        .oneshot(session_request(Some("Bearer not.a.token")))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await?["error"]["code"],
        json!("invalid_token")
    );

    // A non-bearer scheme counts as no token at all.
    let response = app
        .oneshot(session_request(Some("Basic dXNlcjpwYXNz")))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn status_route_never_rejects() -> Result<()> {
    let app = app(true, 10);
    let request = Request::builder()
        .uri("/v1/auth/status")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["authenticated"], json!(false));
    Ok(())
}

#[tokio::test]
async fn missing_pin_hash_is_service_unavailable() -> Result<()> {
    let settings = AuthSettings::new(false, Some(SecretString::from(SECRET)), None, 3600)?;
    let auth = AuthState::new(
        Arc::new(SettingsProvider::from(settings)),
        RateLimitConfig::default(),
    );
    let app = router(Arc::new(ApiState::new(auth, "test")));

    let response = app
        .oneshot(login_request(&pin_body(PIN), "192.0.2.8"))
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await?["error"]["code"],
        json!("auth_not_configured")
    );
    Ok(())
}

#[tokio::test]
async fn health_reports_auth_mode() -> Result<()> {
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = app(true, 10).oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body = json_body(response).await?;
    assert_eq!(body["name"], json!("echo-auth"));
    assert_eq!(body["auth_required"], json!(true));
    Ok(())
}
