//! Auth settings: parsing, validation and the memoized provider.
//!
//! Settings come from the environment (or from CLI flags that clap already
//! merged with the environment) and are validated once. When `AUTH_REQUIRED`
//! is on, a missing or weak secret and a missing or unrecognized PIN hash are
//! fatal configuration errors, so the server refuses to start rather than
//! serving protected routes with a broken gate.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use super::pin::is_supported_hash;

pub const ENV_AUTH_REQUIRED: &str = "AUTH_REQUIRED";
pub const ENV_AUTH_JWT_SECRET: &str = "AUTH_JWT_SECRET";
pub const ENV_AUTH_PIN_HASH: &str = "AUTH_PIN_HASH";
pub const ENV_AUTH_TOKEN_TTL_SECONDS: &str = "AUTH_TOKEN_TTL_SECONDS";

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 12 * 60 * 60;
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("AUTH_JWT_SECRET is required when AUTH_REQUIRED=true")]
    MissingSecret,
    #[error("AUTH_PIN_HASH is required when AUTH_REQUIRED=true")]
    MissingPinHash,
    #[error("AUTH_JWT_SECRET must be at least 32 bytes")]
    SecretTooShort,
    #[error("AUTH_PIN_HASH must be a bcrypt ($2a$, $2b$, $2y$) or argon2 PHC hash")]
    MalformedPinHash,
    #[error("AUTH_TOKEN_TTL_SECONDS must be a valid integer")]
    InvalidTtl,
    #[error("AUTH_TOKEN_TTL_SECONDS must be a positive integer")]
    NonPositiveTtl,
    #[error("AUTH_JWT_SECRET is not configured")]
    SigningSecretUnavailable,
}

/// Unvalidated settings exactly as read from their source.
#[derive(Clone, Debug, Default)]
pub struct RawSettings {
    pub auth_required: Option<String>,
    pub jwt_secret: Option<SecretString>,
    pub pin_hash: Option<SecretString>,
    pub token_ttl_seconds: Option<String>,
}

impl RawSettings {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            auth_required: env::var(ENV_AUTH_REQUIRED).ok(),
            jwt_secret: env::var(ENV_AUTH_JWT_SECRET).ok().map(SecretString::from),
            pin_hash: env::var(ENV_AUTH_PIN_HASH).ok().map(SecretString::from),
            token_ttl_seconds: env::var(ENV_AUTH_TOKEN_TTL_SECONDS).ok(),
        }
    }

    /// Parse and validate into [`AuthSettings`].
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the TTL is not a positive integer or when
    /// enforcement is on and the secret or PIN hash is absent or malformed.
    pub fn parse(self) -> Result<AuthSettings, ConfigError> {
        let auth_required = self
            .auth_required
            .as_deref()
            .is_some_and(parse_flag);

        let token_ttl_seconds = match self.token_ttl_seconds.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TOKEN_TTL_SECONDS,
            Some(value) => value.parse::<i64>().map_err(|_| ConfigError::InvalidTtl)?,
        };

        let settings = AuthSettings {
            auth_required,
            signing_secret: non_empty(self.jwt_secret),
            credential_hash: non_empty(self.pin_hash),
            token_ttl_seconds,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn non_empty(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|secret| !secret.expose_secret().trim().is_empty())
}

/// Validated authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    auth_required: bool,
    signing_secret: Option<SecretString>,
    credential_hash: Option<SecretString>,
    token_ttl_seconds: i64,
}

impl AuthSettings {
    /// Build settings directly, validating them the same way the loader does.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the combination is invalid.
    pub fn new(
        auth_required: bool,
        signing_secret: Option<SecretString>,
        credential_hash: Option<SecretString>,
        token_ttl_seconds: i64,
    ) -> Result<Self, ConfigError> {
        let settings = Self {
            auth_required,
            signing_secret: non_empty(signing_secret),
            credential_hash: non_empty(credential_hash),
            token_ttl_seconds,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_required {
            let secret = self
                .signing_secret
                .as_ref()
                .ok_or(ConfigError::MissingSecret)?;
            let pin_hash = self
                .credential_hash
                .as_ref()
                .ok_or(ConfigError::MissingPinHash)?;
            if secret.expose_secret().len() < MIN_SECRET_BYTES {
                return Err(ConfigError::SecretTooShort);
            }
            if !is_supported_hash(pin_hash.expose_secret()) {
                return Err(ConfigError::MalformedPinHash);
            }
        }
        if self.token_ttl_seconds <= 0 {
            return Err(ConfigError::NonPositiveTtl);
        }
        Ok(())
    }

    #[must_use]
    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    #[must_use]
    pub fn signing_secret(&self) -> Option<&SecretString> {
        self.signing_secret.as_ref()
    }

    #[must_use]
    pub fn credential_hash(&self) -> Option<&SecretString> {
        self.credential_hash.as_ref()
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

type Loader = dyn Fn() -> Result<AuthSettings, ConfigError> + Send + Sync;

/// Compute-once cache in front of a settings source.
///
/// The first successful [`get`](Self::get) stores the parsed settings; later
/// calls clone the `Arc`. Failed loads are not cached.
pub struct SettingsProvider {
    loader: Box<Loader>,
    cache: RwLock<Option<Arc<AuthSettings>>>,
}

impl SettingsProvider {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<AuthSettings, ConfigError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            cache: RwLock::new(None),
        }
    }

    /// Settings read from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(|| RawSettings::from_env().parse())
    }

    /// Settings from a fixed set of raw values (e.g. parsed CLI flags).
    #[must_use]
    pub fn from_raw(raw: RawSettings) -> Self {
        Self::new(move || raw.clone().parse())
    }

    /// Return the cached settings, computing them on first use.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the source does not validate.
    pub fn get(&self) -> Result<Arc<AuthSettings>, ConfigError> {
        if let Some(settings) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(settings));
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race while we waited for the write lock.
        if let Some(settings) = cache.as_ref() {
            return Ok(Arc::clone(settings));
        }
        let settings = Arc::new((self.loader)()?);
        *cache = Some(Arc::clone(&settings));
        Ok(settings)
    }

    /// Drop the cached value so the next `get` re-reads the source.
    pub fn clear_cache(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl From<AuthSettings> for SettingsProvider {
    fn from(settings: AuthSettings) -> Self {
        Self::new(move || Ok(settings.clone()))
    }
}

impl std::fmt::Debug for SettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .read()
            .map(|cache| cache.is_some())
            .unwrap_or(false);
        f.debug_struct("SettingsProvider")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-jwt-secret-that-is-at-least-32-characters-long";
    const BCRYPT_HASH: &str = "$2b$04$abcdefghijklmnopqrstuuBCxs3V4qsSRRxXgEMUZk7Q3y9Jsqe9W";

    fn enabled_env<'a>() -> [(&'a str, Option<&'a str>); 4] {
        [
            (ENV_AUTH_REQUIRED, Some("true")),
            (ENV_AUTH_JWT_SECRET, Some(SECRET)),
            (ENV_AUTH_PIN_HASH, Some(BCRYPT_HASH)),
            (ENV_AUTH_TOKEN_TTL_SECONDS, None),
        ]
    }

    #[test]
    fn defaults_to_permissive_with_twelve_hour_ttl() {
        temp_env::with_vars(
            [
                (ENV_AUTH_REQUIRED, None::<&str>),
                (ENV_AUTH_JWT_SECRET, None),
                (ENV_AUTH_PIN_HASH, None),
                (ENV_AUTH_TOKEN_TTL_SECONDS, None),
            ],
            || {
                let settings = SettingsProvider::from_env().get();
                let settings = settings.as_deref().ok();
                assert_eq!(settings.map(AuthSettings::auth_required), Some(false));
                assert_eq!(
                    settings.map(AuthSettings::token_ttl_seconds),
                    Some(DEFAULT_TOKEN_TTL_SECONDS)
                );
            },
        );
    }

    #[test]
    fn enabled_settings_load() {
        temp_env::with_vars(enabled_env(), || {
            let settings = SettingsProvider::from_env().get();
            assert!(settings.is_ok_and(|s| s.auth_required() && s.signing_secret().is_some()));
        });
    }

    #[test]
    fn flag_accepts_common_truthy_values() {
        for value in ["true", "TRUE", "1", "yes", " Yes "] {
            assert!(parse_flag(value), "{value} should enable auth");
        }
        for value in ["false", "0", "no", "on", ""] {
            assert!(!parse_flag(value), "{value} should not enable auth");
        }
    }

    #[test]
    fn required_without_secret_fails() {
        temp_env::with_vars(
            [
                (ENV_AUTH_REQUIRED, Some("true")),
                (ENV_AUTH_JWT_SECRET, None),
                (ENV_AUTH_PIN_HASH, Some(BCRYPT_HASH)),
            ],
            || {
                let err = SettingsProvider::from_env().get().err();
                assert_eq!(err, Some(ConfigError::MissingSecret));
            },
        );
    }

    #[test]
    fn required_without_pin_hash_fails() {
        temp_env::with_vars(
            [
                (ENV_AUTH_REQUIRED, Some("true")),
                (ENV_AUTH_JWT_SECRET, Some(SECRET)),
                (ENV_AUTH_PIN_HASH, Some("   ")),
            ],
            || {
                let err = SettingsProvider::from_env().get().err();
                assert_eq!(err, Some(ConfigError::MissingPinHash));
            },
        );
    }

    #[test]
    fn short_secret_fails() {
        temp_env::with_vars(
            [
                (ENV_AUTH_REQUIRED, Some("true")),
                (ENV_AUTH_JWT_SECRET, Some("too-short")),
                (ENV_AUTH_PIN_HASH, Some(BCRYPT_HASH)),
            ],
            || {
                let err = SettingsProvider::from_env().get().err();
                assert_eq!(err, Some(ConfigError::SecretTooShort));
            },
        );
    }

    #[test]
    fn plaintext_pin_hash_fails() {
        temp_env::with_vars(
            [
                (ENV_AUTH_REQUIRED, Some("true")),
                (ENV_AUTH_JWT_SECRET, Some(SECRET)),
                (ENV_AUTH_PIN_HASH, Some("12345678")),
            ],
            || {
                let err = SettingsProvider::from_env().get().err();
                assert_eq!(err, Some(ConfigError::MalformedPinHash));
            },
        );
    }

    #[test]
    fn weak_config_is_tolerated_when_not_required() {
        let raw = RawSettings {
            auth_required: Some("false".to_string()),
            jwt_secret: Some(SecretString::from("short")),
            pin_hash: None,
            token_ttl_seconds: None,
        };
        assert!(raw.parse().is_ok());
    }

    #[test]
    fn ttl_must_be_a_positive_integer() {
        let raw = |ttl: &str| RawSettings {
            token_ttl_seconds: Some(ttl.to_string()),
            ..RawSettings::default()
        };
        assert_eq!(raw("abc").parse().err(), Some(ConfigError::InvalidTtl));
        assert_eq!(raw("0").parse().err(), Some(ConfigError::NonPositiveTtl));
        assert_eq!(raw("-5").parse().err(), Some(ConfigError::NonPositiveTtl));
        assert_eq!(raw("60").parse().map(|s| s.token_ttl_seconds()), Ok(60));
    }

    #[test]
    fn cache_holds_until_cleared() {
        temp_env::with_vars([(ENV_AUTH_TOKEN_TTL_SECONDS, Some("100"))], || {
            let provider = SettingsProvider::from_env();
            let first = provider.get().map(|s| s.token_ttl_seconds());
            assert_eq!(first, Ok(100));

            temp_env::with_vars([(ENV_AUTH_TOKEN_TTL_SECONDS, Some("200"))], || {
                assert_eq!(provider.get().map(|s| s.token_ttl_seconds()), Ok(100));
                provider.clear_cache();
                assert_eq!(provider.get().map(|s| s.token_ttl_seconds()), Ok(200));
            });
        });
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let settings = AuthSettings::new(
            true,
            Some(SecretString::from(SECRET)),
            Some(SecretString::from(BCRYPT_HASH)),
            60,
        );
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains(BCRYPT_HASH));
    }
}
