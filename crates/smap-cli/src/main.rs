//! smap CLI - discover the sitemaps a website publishes
//!
//! This is the main entry point for the smap command-line interface. It
//! parses arguments, loads configuration, runs discovery and prints the
//! report.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use smap_core::{CancelToken, Config, Discoverer, parse_base_url};
use std::process::ExitCode;
use tracing::warn;

mod cli;
mod error;
mod output;
mod utils;

use cli::Cli;
use error::{CliError, ErrorCategory, exit_code_from_error};
use utils::logging::initialize_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are not errors
            let code = if err.use_stderr() {
                ErrorCategory::Usage.as_exit_code()
            } else {
                ExitCode::SUCCESS
            };
            // Nowhere left to report a failed write of the usage message
            let _ = err.print();
            return code;
        },
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_code_from_error(&err))
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    initialize_logging(&cli).map_err(CliError::internal)?;

    let config = load_config(&cli)?;
    parse_base_url(&cli.base_url).map_err(CliError::usage)?;

    let discoverer = Discoverer::new(&config).map_err(CliError::internal)?;
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let results = discoverer
        .discover_with_cancel(&cli.base_url, &cancel)
        .await
        .map_err(CliError::usage)?;

    output::print_report(&results, cli.format, config.display.threshold)
        .map_err(CliError::internal)?;
    Ok(())
}

/// Load configuration from `--config`, `SMAP_CONFIG` or the default location,
/// then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.map_err(CliError::usage)?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Cancel discovery on the first Ctrl-C; the run then prints what it has.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with partial results");
            cancel.cancel();
        }
    });
}
