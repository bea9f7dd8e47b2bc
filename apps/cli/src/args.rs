//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use flash_vault::EnvelopeFormat;
use std::path::PathBuf;

/// Command-line entry of the `flash` tool.
#[derive(Debug, Parser)]
#[command(name = "flash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Seal node TLS certificates and macaroons into encrypted containers")]
pub struct Cli {
    /// Configuration file (defaults to ./flash.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt a certificate and macaroon under a new key and print the key
    Seal {
        /// TLS certificate file
        #[arg(short, long, value_name = "FILE")]
        cert: PathBuf,

        /// Macaroon file
        #[arg(short, long, value_name = "FILE")]
        macaroon: PathBuf,

        /// Container to write (defaults to the configured container)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Authenticate the length header together with the payload
        #[arg(long)]
        bound: bool,
    },
    /// Decrypt and verify a container, printing only the secret sizes
    Open {
        /// Container to read (defaults to the configured container)
        #[arg(short = 'a', long = "auth", value_name = "FILE")]
        container: Option<PathBuf>,

        /// Key string printed by `seal`
        #[arg(short, long, env = "FLASH_KEY", hide_env_values = true)]
        key: String,

        /// The container was sealed with --bound
        #[arg(long)]
        bound: bool,
    },
    /// Print the unverified header of a container
    Inspect {
        /// Container to read (defaults to the configured container)
        #[arg(short = 'a', long = "auth", value_name = "FILE")]
        container: Option<PathBuf>,
    },
    /// Print a fresh key string
    Keygen {},
}

/// `--bound` wins; otherwise the configured format applies.
#[must_use]
pub const fn envelope_format(bound: bool, configured: EnvelopeFormat) -> EnvelopeFormat {
    if bound { EnvelopeFormat::Bound } else { configured }
}
