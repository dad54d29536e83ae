//! JSON output formatting

use anyhow::Result;
use smap_core::DiscoveryResult;

pub struct JsonFormatter;

impl JsonFormatter {
    /// Render results as a pretty-printed JSON array
    pub fn render(results: &[DiscoveryResult]) -> Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Print results as a pretty-printed JSON array
    pub fn print(results: &[DiscoveryResult]) -> Result<()> {
        println!("{}", Self::render(results)?);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use smap_core::{ResultOrigin, SitemapDocument};

    #[test]
    fn test_renders_full_results() {
        let results = vec![DiscoveryResult {
            source_url: "https://example.com/sitemap.xml".into(),
            origin: ResultOrigin::RobotsTxt,
            document: SitemapDocument::Leaf {
                urls: (0..100).map(|i| format!("https://example.com/{i}")).collect(),
            },
        }];

        let json: serde_json::Value = serde_json::from_str(&JsonFormatter::render(&results).unwrap()).unwrap();
        assert_eq!(json[0]["source_url"], "https://example.com/sitemap.xml");
        assert_eq!(json[0]["origin"], "robots_txt");
        assert_eq!(json[0]["document"]["type"], "leaf");
        assert_eq!(json[0]["document"]["urls"].as_array().unwrap().len(), 100);
    }

    #[test]
    fn test_empty_results_render_as_empty_array() {
        assert_eq!(JsonFormatter::render(&[]).unwrap(), "[]");
    }
}
