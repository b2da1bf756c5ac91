use crate::auth::pin::hash_pin;
use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, IsTerminal};

/// Read a PIN from stdin and print its Argon2id hash.
/// # Errors
/// Returns an error if stdin cannot be read, the PIN is empty, or hashing fails.
pub async fn execute() -> Result<()> {
    let hash = tokio::task::spawn_blocking(|| -> Result<String> {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            eprint!("PIN: ");
        }
        let mut line = String::new();
        stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read PIN from stdin")?;
        let pin = strip_newline(&line);
        if pin.is_empty() {
            return Err(anyhow!("no PIN given on stdin"));
        }
        hash_pin(pin)
    })
    .await
    .context("hash-pin task failed")??;

    println!("{hash}");
    Ok(())
}

// Only the line terminator is removed; other whitespace is part of the PIN.
fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n')
        .map_or(line, |rest| rest.strip_suffix('\r').unwrap_or(rest))
}
