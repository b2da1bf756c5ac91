//! HS256 bearer tokens.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, base64url without
//! padding) with a fixed claim set: `sub`, `iat`, `exp` and `jti`. The header
//! must declare `HS256`; anything else, `none` included, is rejected before the
//! signature is looked at.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::settings::{ConfigError, SettingsProvider};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "HS256";
/// The single operator identity tokens are issued for.
pub const DEFAULT_SUBJECT: &str = "mrw";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
    #[error("token used before issued-at")]
    NotYetValid,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("token expired")]
    Expired,
    #[error("invalid token ttl")]
    InvalidTtl,
    #[error("no signing secret available for verification")]
    NoVerificationKey,
    #[error("invalid signing key")]
    InvalidKey,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TokenError {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Fixed tag for logs; never includes data taken from the token.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TokenFormat => "token_format",
            Self::Base64 => "base64",
            Self::Json => "json",
            Self::UnsupportedAlg(_) => "unsupported_alg",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingClaim(_) => "missing_claim",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::Expired => "expired",
            Self::InvalidTtl => "invalid_ttl",
            Self::NoVerificationKey => "no_verification_key",
            Self::InvalidKey => "invalid_key",
            Self::Config(_) => "config",
        }
    }

    /// Errors caused by server configuration rather than by the token itself.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    sub: &'a str,
    iat: i64,
    exp: i64,
    jti: &'a str,
}

// Decoded separately so an absent claim is reported by name instead of as a
// generic JSON error.
#[derive(Debug, Default, Deserialize)]
struct PresentedClaims {
    sub: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    jti: Option<String>,
}

/// Claims of a verified token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenPayload {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: String,
}

/// A freshly signed token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Json)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Json)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenError::InvalidTimestamp)
}

fn mac(secret: &[u8], signing_input: &str) -> Result<HmacSha256, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

/// Sign `claims` into a compact HS256 token.
fn sign_hs256(secret: &[u8], claims: &TokenClaims<'_>) -> Result<String, TokenError> {
    let header_b64 = b64e_json(&TokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = mac(secret, &signing_input)?.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);
    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify a compact HS256 token and return its claims.
///
/// The signature is checked (in constant time) before any claim is decoded.
fn verify_hs256(
    token: &str,
    secret: &[u8],
    now_unix_seconds: i64,
) -> Result<TokenPayload, TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
    if parts.next().is_some() {
        return Err(TokenError::TokenFormat);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::UnsupportedAlg(header.alg));
    }

    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
    mac(secret, &format!("{header_b64}.{claims_b64}"))?
        .verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: PresentedClaims = b64d_json(claims_b64)?;
    let subject = claims.sub.ok_or(TokenError::MissingClaim("sub"))?;
    let iat = claims.iat.ok_or(TokenError::MissingClaim("iat"))?;
    let exp = claims.exp.ok_or(TokenError::MissingClaim("exp"))?;
    let token_id = claims.jti.ok_or(TokenError::MissingClaim("jti"))?;

    if iat > now_unix_seconds {
        return Err(TokenError::NotYetValid);
    }
    if exp <= now_unix_seconds {
        return Err(TokenError::Expired);
    }

    Ok(TokenPayload {
        subject,
        issued_at: timestamp(iat)?,
        expires_at: timestamp(exp)?,
        token_id,
    })
}

/// Issues and verifies tokens with the configured signing secret.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    settings: Arc<SettingsProvider>,
}

impl TokenCodec {
    #[must_use]
    pub fn new(settings: Arc<SettingsProvider>) -> Self {
        Self { settings }
    }

    /// Issue a token for `subject` (default [`DEFAULT_SUBJECT`]) that lives for
    /// `ttl_seconds` (default from settings).
    ///
    /// # Errors
    /// Returns [`TokenError::Config`] when no signing secret is configured and
    /// [`TokenError::InvalidTtl`] for a negative lifetime.
    pub fn issue(
        &self,
        subject: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, ttl_seconds, Utc::now().timestamp())
    }

    /// Like [`issue`](Self::issue) with an explicit clock.
    ///
    /// # Errors
    /// See [`issue`](Self::issue).
    pub fn issue_at(
        &self,
        subject: Option<&str>,
        ttl_seconds: Option<i64>,
        now_unix_seconds: i64,
    ) -> Result<IssuedToken, TokenError> {
        let settings = self.settings.get()?;
        let secret = settings
            .signing_secret()
            .ok_or(ConfigError::SigningSecretUnavailable)?;

        let ttl = ttl_seconds.unwrap_or_else(|| settings.token_ttl_seconds());
        if ttl < 0 {
            return Err(TokenError::InvalidTtl);
        }
        let exp = now_unix_seconds
            .checked_add(ttl)
            .ok_or(TokenError::InvalidTtl)?;
        let expires_at = timestamp(exp)?;

        let token_id = Uuid::new_v4().to_string();
        let claims = TokenClaims {
            sub: subject.unwrap_or(DEFAULT_SUBJECT),
            iat: now_unix_seconds,
            exp,
            jti: &token_id,
        };
        let token = sign_hs256(secret.expose_secret().as_bytes(), &claims)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify `token` against the configured secret and the current time.
    ///
    /// # Errors
    /// [`TokenError::Expired`] once `exp` has passed; any other variant means the
    /// token is not acceptable.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Like [`verify`](Self::verify) with an explicit clock.
    ///
    /// # Errors
    /// See [`verify`](Self::verify).
    pub fn verify_at(
        &self,
        token: &str,
        now_unix_seconds: i64,
    ) -> Result<TokenPayload, TokenError> {
        let settings = self.settings.get()?;
        let secret = settings
            .signing_secret()
            .ok_or(TokenError::NoVerificationKey)?;
        verify_hs256(token, secret.expose_secret().as_bytes(), now_unix_seconds)
    }
}
