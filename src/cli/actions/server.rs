use crate::{
    api::{self, ApiState, SweepConfig},
    auth::{AuthState, RateLimitConfig, RawSettings, SettingsProvider},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub app_env: String,
    pub settings: RawSettings,
    pub limits: RateLimitConfig,
    pub sweep: SweepConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the auth configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let settings = Arc::new(SettingsProvider::from_raw(args.settings));
    let auth = AuthState::new(settings, args.limits);
    let state = Arc::new(ApiState::new(auth, args.app_env));

    api::new(args.port, state, args.sweep).await
}

fn log_startup_args(args: &Args) {
    // Secrets in `settings` are redacted by their Debug impl.
    debug!(
        port = args.port,
        app_env = %args.app_env,
        max_attempts = args.limits.max_attempts,
        window_seconds = args.limits.window.as_secs(),
        sweep_seconds = args.sweep.interval.as_secs(),
        max_age_seconds = args.sweep.max_age.as_secs(),
        "startup configuration"
    );
}
