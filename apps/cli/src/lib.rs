//! # Flash CLI
//!
//! Command handlers behind the `flash` binary. Results go to the given writer (stdout in
//! the binary); logs go to stderr through `flash-logger`.

pub mod args;
mod commands;

pub use crate::args::{Cli, Command, envelope_format};

use anyhow::Result;
use flash_kernel::config::{FlashConfig, LogConfig};
use flash_logger::{LevelFilter, Logger};
use std::io::Write;
use zeroize::Zeroizing;

/// Installs the global logger from configuration; each `-v` overrides the configured level.
///
/// # Errors
/// Returns an error for an unknown level name, an unusable log directory, or a second
/// initialization in the same process.
pub fn init_logger(cfg: &LogConfig, verbose: u8) -> Result<Logger> {
    let builder = Logger::builder().name("flash");
    let builder = match verbose {
        0 => builder.level_str(&cfg.level)?,
        1 => builder.level(LevelFilter::DEBUG),
        _ => builder.level(LevelFilter::TRACE),
    };

    let logger = match &cfg.dir {
        Some(dir) => builder.path(dir).json(cfg.json).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}

/// Runs one command, writing its user-facing output to `out`.
///
/// # Errors
/// Any failure of the command, with the vault error kind in the message chain.
pub async fn run(command: Command, cfg: &FlashConfig, out: &mut impl Write) -> Result<()> {
    let vault = &cfg.vault;

    match command {
        Command::Seal { cert, macaroon, output, bound } => {
            let output = output.unwrap_or_else(|| vault.container.clone());
            let format = envelope_format(bound, vault.format);
            commands::seal(out, vault, &cert, &macaroon, &output, format).await
        },
        Command::Open { container, key, bound } => {
            let container = container.unwrap_or_else(|| vault.container.clone());
            let format = envelope_format(bound, vault.format);
            commands::open(out, vault, &container, Zeroizing::new(key), format).await
        },
        Command::Inspect { container } => {
            let container = container.unwrap_or_else(|| vault.container.clone());
            commands::inspect(out, vault, &container).await
        },
        Command::Keygen {} => commands::keygen(out),
    }
}
