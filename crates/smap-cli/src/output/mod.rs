//! # Output Formatting
//!
//! Renders discovery results on stdout.
//!
//! - **Text**: numbered human-readable report, truncated per sitemap
//! - **JSON**: the complete result list, never truncated
//!
//! Text format:
//! ```text
//! Found 1 sitemap(s):
//!
//! 1. Sitemap URL: https://example.com/sitemap.xml [direct]
//!    Sitemap with 3 URLs:
//!    - https://example.com/
//!    - https://example.com/about
//!    ... and 1 more URLs
//! ```
//!
//! JSON format:
//! ```json
//! [{
//!   "source_url": "https://example.com/sitemap.xml",
//!   "origin": "direct",
//!   "document": {"type": "leaf", "urls": ["https://example.com/", "https://example.com/about"]}
//! }]
//! ```

mod json;
mod text;

use anyhow::Result;
use clap::ValueEnum;
use smap_core::DiscoveryResult;

pub use json::JsonFormatter;
pub use text::TextFormatter;

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// Pretty-printed JSON array of results
    Json,
}

/// Print `results` in the requested format.
pub fn print_report(results: &[DiscoveryResult], format: OutputFormat, threshold: usize) -> Result<()> {
    match format {
        OutputFormat::Text => {
            TextFormatter::print(results, threshold);
            Ok(())
        },
        OutputFormat::Json => JsonFormatter::print(results),
    }
}
