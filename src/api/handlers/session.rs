use axum::{Json, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::brain_auth::{BrainAuth, OptionalBrainAuth};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub ok: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<crate::auth::AuthDecision> for SessionStatus {
    fn from(decision: crate::auth::AuthDecision) -> Self {
        let (token_id, expires_at) = decision
            .payload
            .map_or((None, None), |payload| {
                (Some(payload.token_id), Some(payload.expires_at))
            });
        Self {
            ok: true,
            authenticated: decision.authenticated,
            subject: decision.subject,
            token_id,
            expires_at,
        }
    }
}

/// `GET /v1/auth/session`: gate-enforced view of the presented token.
pub async fn session(BrainAuth(decision): BrainAuth) -> impl IntoResponse {
    Json(SessionStatus::from(decision))
}

/// `GET /v1/auth/status`: report whether the caller holds a valid token, never rejecting.
pub async fn status(OptionalBrainAuth(decision): OptionalBrainAuth) -> impl IntoResponse {
    Json(SessionStatus::from(decision))
}
