//! # CLI Structure and Argument Parsing
//!
//! `smap` takes a single positional base URL and a handful of options that
//! override the configuration file.
//!
//! ```bash
//! # Discover and list sitemaps, 50 entries per sitemap
//! smap https://example.com
//!
//! # Show only the first 10 entries of each sitemap
//! smap https://example.com -n 10
//!
//! # Full results as JSON, no truncation
//! smap https://example.com --format json | jq '.[].source_url'
//! ```
//!
//! Diagnostics go to stderr; stdout carries only the report.

use clap::Parser;
use smap_core::Config;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `smap` command
#[derive(Parser, Clone, Debug)]
#[command(name = "smap")]
#[command(version)]
#[command(about = "smap - discover the sitemaps a website publishes", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Base URL of the site to inspect (e.g. <https://example.com>)
    #[arg(value_name = "BASE_URL")]
    pub base_url: String,

    /// Entries listed per sitemap before truncating [default: 50]
    #[arg(short = 'n', long, value_name = "N")]
    pub threshold: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Pause after each probe, in milliseconds [default: 300]
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Per-request timeout, in seconds [default: 10]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Do not scan the homepage when no sitemap is found
    #[arg(long)]
    pub no_homepage_fallback: bool,

    /// Configuration file (overrides SMAP_CONFIG and the default location)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show debug diagnostics
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Disable colored output (also honours NO_COLOR)
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.display.threshold = threshold;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.discovery.probe_delay_ms = delay_ms;
        }
        if let Some(timeout) = self.timeout {
            config.fetch.timeout_secs = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.fetch.user_agent.clone_from(user_agent);
        }
        if self.no_homepage_fallback {
            config.discovery.homepage_fallback = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["smap", "https://example.com"]).unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config, Config::default());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "smap",
            "https://example.com",
            "-n",
            "5",
            "--delay-ms",
            "0",
            "--timeout",
            "3",
            "--user-agent",
            "probe/1.0",
            "--no-homepage-fallback",
            "--format",
            "json",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.display.threshold, 5);
        assert_eq!(config.discovery.probe_delay_ms, 0);
        assert_eq!(config.fetch.timeout_secs, 3);
        assert_eq!(config.fetch.user_agent, "probe/1.0");
        assert!(!config.discovery.homepage_fallback);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_base_url_is_required() {
        let err = Cli::try_parse_from(["smap"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["smap", "https://example.com", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let err = Cli::try_parse_from(["smap", "https://example.com", "-v", "-q"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}
