//! # echo-auth (PIN login and bearer-token gate)
//!
//! `echo-auth` guards the Echo backend's single-operator API. The operator
//! exchanges a PIN for a short-lived HS256 bearer token, and protected routes
//! check that token on every request.
//!
//! ## Login
//!
//! `POST /v1/auth/login` verifies the PIN against a bcrypt or Argon2 hash held
//! in configuration. Attempts are limited per client (10 per 10 minutes by
//! default) with an in-memory sliding window; a successful login clears the
//! client's window.
//!
//! ## Enforcement
//!
//! With `AUTH_REQUIRED=true` every protected request needs a valid token and
//! the server refuses to start without a strong signing secret and a PIN hash.
//! With enforcement off, requests without a token are let through, but a token
//! that is presented is still verified and rejected if bad.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// UTC timestamp of the build, reported in login runtime metadata.
pub const BUILD_TIME: &str = built_info::BUILT_TIME_UTC;
