//! Best-effort sitemap references from homepage markup.
//!
//! This is a line-oriented text heuristic, not an HTML parser. It over-matches
//! (an indicator inside unrelated text) and under-matches (references split
//! across lines, single-quoted attributes). It only runs when every
//! conventional location came up empty.

use url::Url;

/// Scan `html` for URLs that look like sitemap references.
///
/// For every line and every indicator contained in that line:
///
/// - if the line contains `http`, the text from the first `http` up to the
///   next `"` is taken verbatim;
/// - otherwise the text from the indicator up to the next `"` is resolved
///   against `base_url`.
///
/// Nothing is extracted when the closing `"` is missing. One line can yield
/// several (possibly identical) candidates, one per matching indicator.
///
/// ```
/// use smap_core::discovery::html::scan_for_sitemap_references;
///
/// let html = r#"<link rel="sitemap" href="https://example.com/sitemap.xml">"#;
/// let found = scan_for_sitemap_references(html, "https://example.com", &["sitemap.xml"]);
/// assert_eq!(found, ["https://example.com/sitemap.xml"]);
/// ```
#[must_use]
pub fn scan_for_sitemap_references<S: AsRef<str>>(
    html: &str,
    base_url: &str,
    indicators: &[S],
) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let mut found = Vec::new();

    for line in html.split('\n') {
        for indicator in indicators {
            let indicator = indicator.as_ref();
            if indicator.is_empty() || !line.contains(indicator) {
                continue;
            }

            if let Some(start) = line.find("http") {
                if let Some(url) = quoted_from(line, start) {
                    found.push(url.to_string());
                }
            } else if let Some(start) = line.find(indicator) {
                let resolved = quoted_from(line, start)
                    .and_then(|relative| base.as_ref()?.join(relative).ok());
                if let Some(url) = resolved {
                    found.push(url.to_string());
                }
            }
        }
    }

    found
}

/// Text from `start` up to (not including) the next `"`.
fn quoted_from(line: &str, start: usize) -> Option<&str> {
    let rest = &line[start..];
    rest.find('"').map(|end| &rest[..end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CANDIDATE_PATHS;

    fn scan(html: &str) -> Vec<String> {
        scan_for_sitemap_references(html, "https://example.com", &DEFAULT_CANDIDATE_PATHS)
    }

    #[test]
    fn test_absolute_reference() {
        let html = "<html>\n<a href=\"https://cdn.example.com/sitemap_index.xml\">map</a>\n</html>";
        assert_eq!(scan(html), vec!["https://cdn.example.com/sitemap_index.xml"]);
    }

    #[test]
    fn test_relative_reference_is_resolved_from_indicator() {
        let html = r#"<link rel="sitemap" href="/static/sitemap.xml">"#;
        // Extraction starts at the indicator, so the directory prefix is dropped
        assert_eq!(scan(html), vec!["https://example.com/sitemap.xml"]);
    }

    #[test]
    fn test_relative_reference_joins_against_base_path() {
        let found = scan_for_sitemap_references(
            r#"<a href="sitemap.xml">"#,
            "https://example.com/blog/",
            &["sitemap.xml"],
        );
        assert_eq!(found, vec!["https://example.com/blog/sitemap.xml"]);
    }

    #[test]
    fn test_first_http_on_line_wins() {
        let html = r#"<a href="https://example.com/about">About</a> <a href="/sitemap.xml">Map</a>"#;
        assert_eq!(scan(html), vec!["https://example.com/about"]);
    }

    #[test]
    fn test_missing_closing_quote_yields_nothing() {
        assert!(scan("see https://example.com/sitemap.xml for details").is_empty());
        assert!(scan("<a href='/sitemap.xml'>").is_empty());
    }

    #[test]
    fn test_one_candidate_per_matching_indicator() {
        // `sitemap.xml.gz` contains `sitemap.xml` too
        let html = r#"<a href="https://example.com/sitemap.xml.gz">"#;
        assert_eq!(
            scan(html),
            vec![
                "https://example.com/sitemap.xml.gz",
                "https://example.com/sitemap.xml.gz"
            ]
        );
    }

    #[test]
    fn test_lines_without_indicators_are_ignored() {
        let html = "<html>\n<a href=\"https://example.com/contact\">\n</html>";
        assert!(scan(html).is_empty());
    }

    #[test]
    fn test_unparsable_base_drops_relative_results_only() {
        let html = "<a href=\"/sitemap.xml\">\n<a href=\"https://e.com/sitemap_index.xml\">";
        let found = scan_for_sitemap_references(html, "not a url", &["sitemap.xml", "sitemap_index.xml"]);
        assert_eq!(found, vec!["https://e.com/sitemap_index.xml"]);
    }
}
