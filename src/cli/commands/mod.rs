pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_APP_ENV: &str = "app-env";
pub const CMD_HASH_PIN: &str = "hash-pin";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("echo-auth")
        .about("PIN login and bearer-token gate for the Echo API")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("ECHO_AUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_APP_ENV)
                .long(ARG_APP_ENV)
                .help("Deployment environment reported in login responses")
                .default_value("unknown")
                .env("APP_ENV"),
        )
        .subcommand(
            Command::new(CMD_HASH_PIN)
                .about("Read a PIN from stdin and print an Argon2id hash for AUTH_PIN_HASH"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
