//! API handlers for the auth surface.
//!
//! `login` exchanges a PIN for a token, `brain_auth` provides the extractors
//! protected routes use, `session` exposes them for clients checking a token,
//! and `response` holds the shared JSON envelopes.

pub mod brain_auth;
pub mod health;
pub mod login;
pub mod response;
pub mod session;

pub(crate) mod utils;

pub use brain_auth::{AuthRejection, BrainAuth, OptionalBrainAuth};
