//! JSON envelopes for auth responses.
//!
//! Errors are always `{ "ok": false, "error": { "code", "message", "retry_after"? }, "runtime"? }`
//! so clients can branch on `error.code` without parsing messages.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::utils::request_id;
use crate::api::ApiState;
use crate::auth::{GateError, LoginError};

/// Build and deployment details attached to login responses for correlation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuntimeMetadata {
    pub trace_id: String,
    pub provider: &'static str,
    pub env: String,
    pub git_sha: String,
    pub build_time: String,
}

impl RuntimeMetadata {
    #[must_use]
    pub fn new(headers: &HeaderMap, state: &ApiState) -> Self {
        Self {
            trace_id: request_id(headers).unwrap_or_else(|| "none".to_string()),
            provider: "auth",
            env: state.app_env().to_string(),
            git_sha: crate::GIT_COMMIT_HASH.to_string(),
            build_time: crate::BUILD_TIME.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: ErrorInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeMetadata>,
}

/// A rejected auth request: status, headers and the error envelope.
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ErrorBody,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ErrorBody {
                ok: false,
                error: ErrorInfo {
                    code,
                    message: message.into(),
                    retry_after: None,
                },
                runtime: None,
            },
        }
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeMetadata) -> Self {
        self.body.runtime = Some(runtime);
        self
    }

    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.body.error.retry_after = Some(seconds);
        self.headers
            .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        self
    }

    #[must_use]
    pub fn with_bearer_challenge(mut self) -> Self {
        self.headers
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.body.error.code
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, Json(self.body)).into_response()
    }
}

impl From<&LoginError> for ErrorResponse {
    fn from(err: &LoginError) -> Self {
        let status = match err {
            LoginError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            LoginError::InvalidPin => StatusCode::UNAUTHORIZED,
            LoginError::NotConfigured | LoginError::TokenUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        let response = Self::new(status, err.code(), err.to_string());
        match err.retry_after_seconds() {
            Some(seconds) => response.with_retry_after(seconds),
            None => response,
        }
    }
}

impl From<&GateError> for ErrorResponse {
    fn from(err: &GateError) -> Self {
        match err {
            GateError::Config(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.code(), err.to_string())
            }
            GateError::AuthRequired | GateError::TokenExpired | GateError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, err.code(), err.to_string())
                    .with_bearer_challenge()
            }
        }
    }
}
