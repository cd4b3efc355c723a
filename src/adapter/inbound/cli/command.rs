//! Command-line interface definitions.
//!
//! Defines the `cloudlink` CLI using `clap`: offline diagnostics for a
//! gateway's configuration and for the tokens its identities present.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::DEFAULT_EXPIRY_BUFFER;

/// Edge gateway cloud connectivity diagnostics
#[derive(Parser, Debug)]
#[command(name = "cloudlink")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Forced color setting, or `None` to detect.
    #[must_use]
    pub const fn forced(self) -> Option<bool> {
        match self {
            Self::Auto => None,
            Self::Always => Some(true),
            Self::Never => Some(false),
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a configuration file and show the resolved settings
    Check(CheckArgs),

    /// Inspect a token's expiry and usability
    Token(TokenArgs),
}

/// Arguments for `check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "cloudlink.toml")]
    pub config: PathBuf,
}

/// Arguments for `token`.
#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Shared access signature token
    pub token: String,

    /// Minimum remaining validity, in seconds, for the token to be usable
    #[arg(long, default_value_t = DEFAULT_EXPIRY_BUFFER.as_secs())]
    pub buffer_secs: u64,
}
