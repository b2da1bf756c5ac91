//! PIN login and bearer-token authorization.
//!
//! Components, leaf first:
//! - [`settings`]: parse and validate configuration, cached once per provider.
//! - [`pin`]: slow-hash PIN verification (bcrypt or Argon2).
//! - [`token`]: HS256 token issue/verify.
//! - [`rate_limit`]: per-client sliding window guarding login.
//! - [`gate`]: request-time admit/reject decision.
//! - [`login`]: the login flow tying the above together.
//!
//! Everything is built explicitly and shared through [`AuthState`]; there are
//! no module-level singletons.

pub mod gate;
pub mod login;
pub mod pin;
pub mod rate_limit;
pub mod settings;
pub mod token;

pub use gate::{AuthDecision, AuthGate, GateError};
pub use login::{LoginError, LoginGrant, LoginService};
pub use rate_limit::{LoginRateLimiter, RateLimitConfig, RateLimitExceeded};
pub use settings::{AuthSettings, ConfigError, RawSettings, SettingsProvider};
pub use token::{TokenCodec, TokenError, TokenPayload};

use std::sync::Arc;

/// Shared handles to the auth components.
#[derive(Debug, Clone)]
pub struct AuthState {
    settings: Arc<SettingsProvider>,
    limiter: Arc<LoginRateLimiter>,
    gate: AuthGate,
    login: LoginService,
}

impl AuthState {
    #[must_use]
    pub fn new(settings: Arc<SettingsProvider>, limits: RateLimitConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(Arc::clone(&settings)));
        let limiter = Arc::new(LoginRateLimiter::new(limits));
        let gate = AuthGate::new(Arc::clone(&settings), Arc::clone(&codec));
        let login = LoginService::new(Arc::clone(&settings), codec, Arc::clone(&limiter));
        Self {
            settings,
            limiter,
            gate,
            login,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<SettingsProvider> {
        &self.settings
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<LoginRateLimiter> {
        &self.limiter
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[must_use]
    pub fn login(&self) -> &LoginService {
        &self.login
    }
}
