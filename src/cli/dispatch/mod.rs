//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an [`Action`]: `hash-pin` when the
//! subcommand is given, otherwise the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_APP_ENV, ARG_PORT, CMD_HASH_PIN, auth};
use anyhow::Result;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if an argument cannot be converted.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if matches.subcommand_name() == Some(CMD_HASH_PIN) {
        return Ok(Action::HashPin);
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let app_env = matches
        .get_one::<String>(ARG_APP_ENV)
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        app_env,
        settings: auth_opts.settings,
        limits: auth_opts.limits,
        sweep: auth_opts.sweep,
    }))
}
