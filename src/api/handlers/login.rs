use axum::{
    Extension, Json,
    extract::{ConnectInfo, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tracing::{Span, error, info, instrument};

use super::response::{ErrorResponse, RuntimeMetadata};
use super::utils::extract_client_ip;
use crate::api::ApiState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub runtime: RuntimeMetadata,
}

/// `POST /v1/auth/login`: exchange the PIN for a bearer token.
#[instrument(skip_all, fields(client_ip = tracing::field::Empty))]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Extension(state): Extension<Arc<ApiState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let runtime = RuntimeMetadata::new(&headers, &state);
    let client_ip = extract_client_ip(&headers)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    Span::current().record("client_ip", client_ip.as_str());

    // Never log the PIN.
    info!(trace_id = %runtime.trace_id, "login attempt");

    // Malformed bodies are rejected before they can consume a rate limit slot.
    let pin = match payload {
        Ok(Json(request)) if !request.pin.is_empty() => request.pin,
        Ok(_) => {
            return invalid_request("PIN must not be empty.", runtime);
        }
        Err(rejection) => {
            return invalid_request(rejection.body_text(), runtime);
        }
    };

    let service = state.auth().login().clone();
    let outcome = tokio::task::spawn_blocking(move || service.login(&pin, &client_ip)).await;

    match outcome {
        Ok(Ok(grant)) => (
            StatusCode::OK,
            Json(LoginResponse {
                ok: true,
                token: grant.token,
                expires_at: grant.expires_at,
                runtime,
            }),
        )
            .into_response(),
        Ok(Err(err)) => ErrorResponse::from(&err)
            .with_runtime(runtime)
            .into_response(),
        Err(err) => {
            error!("login task failed: {err}");
            ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error.",
            )
            .with_runtime(runtime)
            .into_response()
        }
    }
}

fn invalid_request(message: impl Into<String>, runtime: RuntimeMetadata) -> Response {
    ErrorResponse::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message)
        .with_runtime(runtime)
        .into_response()
}
