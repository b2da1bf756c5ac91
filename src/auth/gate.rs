//! Request-time authorization decision.
//!
//! When enforcement is off an absent token is let through, but a token that is
//! presented is always verified: a bad token is never silently ignored.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::settings::{ConfigError, SettingsProvider};
use super::token::{TokenCodec, TokenPayload};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Authentication required. Please provide a valid bearer token.")]
    AuthRequired,
    #[error("Token has expired. Please login again.")]
    TokenExpired,
    #[error("Invalid authentication token.")]
    InvalidToken,
    #[error("Authentication is not configured on this server.")]
    Config(#[source] ConfigError),
}

impl GateError {
    /// Stable machine-readable code for API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::TokenExpired => "token_expired",
            Self::InvalidToken => "invalid_token",
            Self::Config(_) => "auth_not_configured",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthDecision {
    pub authenticated: bool,
    pub subject: Option<String>,
    pub payload: Option<TokenPayload>,
}

impl AuthDecision {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(payload: TokenPayload) -> Self {
        Self {
            authenticated: true,
            subject: Some(payload.subject.clone()),
            payload: Some(payload),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    settings: Arc<SettingsProvider>,
    codec: Arc<TokenCodec>,
}

impl AuthGate {
    #[must_use]
    pub fn new(settings: Arc<SettingsProvider>, codec: Arc<TokenCodec>) -> Self {
        Self { settings, codec }
    }

    /// Decide whether a request carrying `presented` (the raw bearer token, if
    /// any) may proceed.
    ///
    /// # Errors
    /// - [`GateError::AuthRequired`] when no token is presented and enforcement is on.
    /// - [`GateError::TokenExpired`] / [`GateError::InvalidToken`] for a presented
    ///   token that does not verify, whatever the enforcement flag says.
    /// - [`GateError::Config`] when settings cannot be loaded.
    pub fn authorize(&self, presented: Option<&str>) -> Result<AuthDecision, GateError> {
        let settings = self.settings.get().map_err(|err| {
            warn!("auth settings unavailable: {err}");
            GateError::Config(err)
        })?;

        let Some(token) = presented.map(str::trim).filter(|t| !t.is_empty()) else {
            if settings.auth_required() {
                debug!("request rejected: missing bearer token");
                return Err(GateError::AuthRequired);
            }
            return Ok(AuthDecision::anonymous());
        };

        match self.codec.verify(token) {
            Ok(payload) => {
                debug!(sub = %payload.subject, jti = %payload.token_id, "bearer token accepted");
                Ok(AuthDecision::authenticated(payload))
            }
            Err(err) if err.is_expired() => {
                debug!("request rejected: token expired");
                Err(GateError::TokenExpired)
            }
            Err(err) => {
                debug!(reason = err.reason(), "request rejected: invalid token");
                Err(GateError::InvalidToken)
            }
        }
    }

    /// Report authentication status without ever rejecting.
    #[must_use]
    pub fn try_authorize(&self, presented: Option<&str>) -> AuthDecision {
        let Some(token) = presented.map(str::trim).filter(|t| !t.is_empty()) else {
            return AuthDecision::anonymous();
        };
        self.codec
            .verify(token)
            .map_or_else(|_| AuthDecision::anonymous(), AuthDecision::authenticated)
    }
}
