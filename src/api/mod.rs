use crate::auth::rate_limit::spawn_eviction_worker;
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod handlers;
mod state;

pub use state::ApiState;

use handlers::{health, login, session, utils::REQUEST_ID_HEADER};

/// How often idle rate-limit entries are swept, and how idle they must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub interval: Duration,
    pub max_age: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: crate::auth::rate_limit::DEFAULT_SWEEP_INTERVAL,
            max_age: crate::auth::rate_limit::DEFAULT_MAX_AGE,
        }
    }
}

/// Build the auth router with request-id, tracing and state layers.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/auth/login", post(login::login))
        .route("/v1/auth/session", get(session::session))
        .route("/v1/auth/status", get(session::status))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if the settings are invalid or the server fails to start
pub async fn new(port: u16, state: Arc<ApiState>, sweep: SweepConfig) -> Result<()> {
    // Refuse to serve with a broken gate.
    let settings = state
        .auth()
        .settings()
        .get()
        .context("Invalid auth configuration")?;
    info!(
        auth_required = settings.auth_required(),
        token_ttl_seconds = settings.token_ttl_seconds(),
        pin_configured = settings.credential_hash().is_some(),
        "auth settings loaded"
    );

    // Background sweeper keeps the in-memory limiter bounded.
    spawn_eviction_worker(
        Arc::clone(state.auth().limiter()),
        sweep.interval,
        sweep.max_age,
    );

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {err}");
            std::future::pending::<()>().await;
        }
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
