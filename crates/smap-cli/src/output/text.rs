//! Text output formatting

use colored::Colorize;
use smap_core::{DiscoveryResult, SitemapDocument};

const INDENT: &str = "   ";

pub struct TextFormatter;

impl TextFormatter {
    /// Render the numbered report, listing at most `threshold` entries per sitemap
    pub fn render(results: &[DiscoveryResult], threshold: usize) -> String {
        if results.is_empty() {
            return "No sitemaps found".to_string();
        }

        let mut lines: Vec<String> = Vec::new();
        lines.push(String::new());
        lines.push(format!("Found {} sitemap(s):", results.len()).bold().to_string());

        for (idx, result) in results.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!(
                "{}. Sitemap URL: {} {}",
                idx + 1,
                result.source_url.cyan(),
                format!("[{}]", result.origin).bright_black()
            ));

            let (heading, noun) = match &result.document {
                SitemapDocument::Index { sitemaps } => {
                    (format!("Sitemap index with {} sitemaps:", sitemaps.len()), "sitemaps")
                },
                SitemapDocument::Leaf { urls } => {
                    (format!("Sitemap with {} URLs:", urls.len()), "URLs")
                },
            };
            lines.push(format!("{INDENT}{heading}"));

            let entries = result.document.entries();
            for entry in entries.iter().take(threshold) {
                lines.push(format!("{INDENT}- {entry}"));
            }
            if entries.len() > threshold {
                let more = format!("... and {} more {noun}", entries.len() - threshold);
                lines.push(format!("{INDENT}{}", more.dimmed()));
            }
        }

        lines.join("\n")
    }

    /// Print the report to stdout
    pub fn print(results: &[DiscoveryResult], threshold: usize) {
        println!("{}", Self::render(results, threshold));
    }
}
