use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use cloudlink::adapter::inbound::cli::command::{Cli, Commands};
use cloudlink::adapter::inbound::cli::output::{self, OutputConfig};
use cloudlink::adapter::inbound::cli::{check, token};
use cloudlink::infrastructure::config::logging::LoggingConfig;

/// Exit code for a token that parses but is expired or inside the buffer.
const EXIT_TOKEN_UNUSABLE: u8 = 2;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::set_color(cli.color.forced());
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));
    LoggingConfig {
        level: log_level(cli.verbose).into(),
        ..LoggingConfig::default()
    }
    .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Check(args) => {
            check::execute(&args.config)
                .with_context(|| format!("invalid configuration {}", args.config.display()))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Token(args) => {
            let usable = token::execute(&args.token, Duration::from_secs(args.buffer_secs))
                .context("cannot read token")?;
            Ok(if usable {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_TOKEN_UNUSABLE)
            })
        }
    }
}

const fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
