//! Bearer-token extractors for protected routes.
//!
//! `BrainAuth` applies the gate and rejects with a structured 401/503;
//! `OptionalBrainAuth` only reports whether a valid token was presented.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, warn};

use super::response::ErrorResponse;
use super::utils::extract_bearer_token;
use crate::api::ApiState;
use crate::auth::AuthDecision;

fn api_state(parts: &Parts) -> Result<Arc<ApiState>, AuthRejection> {
    parts.extensions.get::<Arc<ApiState>>().cloned().ok_or_else(|| {
        error!("ApiState extension missing from request");
        AuthRejection(ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error.",
        ))
    })
}

#[derive(Debug)]
pub struct AuthRejection(ErrorResponse);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Authorization decision for a route that enforces the gate.
#[derive(Debug, Clone)]
pub struct BrainAuth(pub AuthDecision);

#[async_trait]
impl<S> FromRequestParts<S> for BrainAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = api_state(parts)?;
        let token = extract_bearer_token(&parts.headers);
        state
            .auth()
            .gate()
            .authorize(token)
            .map(Self)
            .map_err(|err| {
                warn!(code = err.code(), "request rejected by auth gate");
                AuthRejection(ErrorResponse::from(&err))
            })
    }
}

/// Authorization status that never rejects the request.
#[derive(Debug, Clone)]
pub struct OptionalBrainAuth(pub AuthDecision);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalBrainAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = api_state(parts)?;
        let token = extract_bearer_token(&parts.headers);
        Ok(Self(state.auth().gate().try_authorize(token)))
    }
}
