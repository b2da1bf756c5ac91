use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

use crate::api::SweepConfig;
use crate::auth::settings::{
    ENV_AUTH_JWT_SECRET, ENV_AUTH_PIN_HASH, ENV_AUTH_REQUIRED, ENV_AUTH_TOKEN_TTL_SECONDS,
};
use crate::auth::{RateLimitConfig, RawSettings};

pub const ARG_AUTH_REQUIRED: &str = "auth-required";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_PIN_HASH: &str = "pin-hash";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_LOGIN_MAX_ATTEMPTS: &str = "login-max-attempts";
pub const ARG_LOGIN_WINDOW_SECONDS: &str = "login-window-seconds";
pub const ARG_RATE_LIMIT_SWEEP_SECONDS: &str = "rate-limit-sweep-seconds";
pub const ARG_RATE_LIMIT_MAX_AGE_SECONDS: &str = "rate-limit-max-age-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub settings: RawSettings,
    pub limits: RateLimitConfig,
    pub sweep: SweepConfig,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// Settings values are passed through unvalidated; the settings loader
    /// owns their validation so flags and env behave the same way.
    ///
    /// # Errors
    /// Returns an error if a numeric limit does not fit the platform.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get = |id: &str| matches.get_one::<String>(id).cloned();
        let seconds = |id: &str| {
            matches
                .get_one::<u64>(id)
                .copied()
                .map(Duration::from_secs)
        };

        let defaults = RateLimitConfig::default();
        let max_attempts = match matches.get_one::<u64>(ARG_LOGIN_MAX_ATTEMPTS) {
            Some(value) => usize::try_from(*value)?,
            None => defaults.max_attempts,
        };

        let sweep_defaults = SweepConfig::default();

        Ok(Self {
            settings: RawSettings {
                auth_required: get(ARG_AUTH_REQUIRED),
                jwt_secret: get(ARG_JWT_SECRET).map(SecretString::from),
                pin_hash: get(ARG_PIN_HASH).map(SecretString::from),
                token_ttl_seconds: get(ARG_TOKEN_TTL_SECONDS),
            },
            limits: RateLimitConfig {
                max_attempts,
                window: seconds(ARG_LOGIN_WINDOW_SECONDS).unwrap_or(defaults.window),
            },
            sweep: SweepConfig {
                interval: seconds(ARG_RATE_LIMIT_SWEEP_SECONDS).unwrap_or(sweep_defaults.interval),
                max_age: seconds(ARG_RATE_LIMIT_MAX_AGE_SECONDS)
                    .unwrap_or(sweep_defaults.max_age),
            },
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_settings_args(command);
    with_rate_limit_args(command)
}

fn with_settings_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_REQUIRED)
                .long(ARG_AUTH_REQUIRED)
                .help("Require a valid bearer token on protected routes (true/1/yes)")
                .env(ENV_AUTH_REQUIRED),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing secret, at least 32 bytes")
                .long_help(
                    "HS256 signing secret for bearer tokens, at least 32 bytes.\n\nPrefer the environment variable: values passed as flags are visible in the process list.",
                )
                .env(ENV_AUTH_JWT_SECRET)
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PIN_HASH)
                .long(ARG_PIN_HASH)
                .help("bcrypt or Argon2 hash of the login PIN (see `hash-pin`)")
                .env(ENV_AUTH_PIN_HASH)
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Bearer token lifetime in seconds (default: 43200)")
                .env(ENV_AUTH_TOKEN_TTL_SECONDS),
        )
}

fn with_rate_limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_MAX_ATTEMPTS)
                .long(ARG_LOGIN_MAX_ATTEMPTS)
                .help("Login attempts allowed per client per window")
                .env("AUTH_LOGIN_MAX_ATTEMPTS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_WINDOW_SECONDS)
                .long(ARG_LOGIN_WINDOW_SECONDS)
                .help("Sliding window for login attempts, in seconds")
                .env("AUTH_LOGIN_WINDOW_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_SWEEP_SECONDS)
                .long(ARG_RATE_LIMIT_SWEEP_SECONDS)
                .help("How often idle rate limit entries are evicted, in seconds")
                .env("AUTH_RATE_LIMIT_SWEEP_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX_AGE_SECONDS)
                .long(ARG_RATE_LIMIT_MAX_AGE_SECONDS)
                .help("Evict clients whose last attempt is older than this, in seconds")
                .env("AUTH_RATE_LIMIT_MAX_AGE_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
