//! `Sitemap:` directive extraction from robots.txt.
//!
//! robots.txt is read as plain text: only lines beginning with `sitemap:`
//! (ASCII case-insensitive) are considered, everything else is ignored. The
//! URL is the remainder of the line after the first `": "`, trimmed. No URL
//! validation happens here; a bad value fails later when it is fetched.

use tracing::debug;

const DIRECTIVE: &str = "sitemap:";
const SEPARATOR: &str = ": ";

/// Extract declared sitemap URLs in file order.
///
/// A `Sitemap:` line with no `": "` separator (for example `Sitemap:https://..`)
/// or with nothing after it is skipped.
///
/// ```
/// use smap_core::discovery::robots::extract_sitemap_urls;
///
/// let robots = "Sitemap: https://a/s1.xml\nUser-agent: *\nsitemap: https://a/s2.xml\n";
/// assert_eq!(extract_sitemap_urls(robots), ["https://a/s1.xml", "https://a/s2.xml"]);
/// ```
#[must_use]
pub fn extract_sitemap_urls(robots_txt: &str) -> Vec<String> {
    robots_txt
        .lines()
        .filter(|line| has_directive_prefix(line))
        .filter_map(|line| {
            let value = line
                .split_once(SEPARATOR)
                .map(|(_, rest)| rest.trim())
                .filter(|rest| !rest.is_empty());
            if value.is_none() {
                debug!(line = %line, "Skipping sitemap directive without a value");
            }
            value.map(str::to_string)
        })
        .collect()
}

fn has_directive_prefix(line: &str) -> bool {
    line.get(..DIRECTIVE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DIRECTIVE))
}
