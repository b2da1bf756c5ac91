//! PIN login: rate limit, verify, then issue a token.
//!
//! Flow Overview:
//! 1) Count the attempt against the client's window (rejected attempts are not counted).
//! 2) Refuse with "not configured" if no PIN hash is set.
//! 3) Verify the PIN; a wrong PIN keeps its slot in the window.
//! 4) On success clear the client's window and issue a token.
//!
//! `login` is synchronous and runs a slow KDF; async callers should move it
//! onto a blocking thread.

use secrecy::ExposeSecret;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::pin::verify_pin;
use super::rate_limit::LoginRateLimiter;
use super::settings::SettingsProvider;
use super::token::{IssuedToken, TokenCodec, TokenError};

/// Token handed out by a successful login.
pub type LoginGrant = IssuedToken;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Too many login attempts. Please try again later.")]
    RateLimited { retry_after_seconds: u64 },
    #[error("Authentication is not configured on this server.")]
    NotConfigured,
    #[error("Invalid PIN.")]
    InvalidPin,
    #[error("Failed to create authentication token.")]
    TokenUnavailable(#[source] TokenError),
}

impl LoginError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limit",
            Self::NotConfigured => "auth_not_configured",
            Self::InvalidPin => "invalid_pin",
            Self::TokenUnavailable(_) => "token_error",
        }
    }

    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginService {
    settings: Arc<SettingsProvider>,
    codec: Arc<TokenCodec>,
    limiter: Arc<LoginRateLimiter>,
}

impl LoginService {
    #[must_use]
    pub fn new(
        settings: Arc<SettingsProvider>,
        codec: Arc<TokenCodec>,
        limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            settings,
            codec,
            limiter,
        }
    }

    /// Exchange `pin` for a token on behalf of `client_id`.
    ///
    /// # Errors
    /// See [`LoginError`]; each variant is one terminal state of the flow.
    pub fn login(&self, pin: &str, client_id: &str) -> Result<LoginGrant, LoginError> {
        if let Err(limited) = self.limiter.check_and_record(client_id) {
            warn!(
                client_ip = client_id,
                retry_after = limited.retry_after_seconds,
                "login rate limited"
            );
            return Err(LoginError::RateLimited {
                retry_after_seconds: limited.retry_after_seconds,
            });
        }

        let settings = self.settings.get().map_err(|err| {
            error!("auth settings unavailable: {err}");
            LoginError::NotConfigured
        })?;
        let Some(pin_hash) = settings.credential_hash() else {
            error!("login attempted but no PIN hash is configured");
            return Err(LoginError::NotConfigured);
        };

        if !verify_pin(pin, pin_hash.expose_secret()) {
            warn!(client_ip = client_id, "login rejected: invalid PIN");
            return Err(LoginError::InvalidPin);
        }

        self.limiter.reset(client_id);

        let grant = self.codec.issue(None, None).map_err(|err| {
            error!(reason = err.reason(), "failed to issue token");
            LoginError::TokenUnavailable(err)
        })?;
        info!(client_ip = client_id, expires_at = %grant.expires_at, "login succeeded");
        Ok(grant)
    }
}
