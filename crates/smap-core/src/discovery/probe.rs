//! Discovery orchestration.
//!
//! A run moves through these phases:
//!
//! ```text
//! Probing -> (RobotsExpansion | DirectFetch)* -> HomepageFallback? -> Done
//! ```
//!
//! Candidates are probed one at a time, in configuration order, with the
//! politeness delay observed after each one. Every failure short of an
//! unusable base URL is logged and skipped, so a run always completes with
//! whatever it found.
//!
//! Index documents are reported as they are: their child sitemaps are not
//! fetched. Total work is bounded by the candidate list plus the URLs named
//! in robots.txt or on the homepage.

use crate::config::{Config, DiscoveryConfig, ROBOTS_PATH};
use crate::decode::decode;
use crate::discovery::html::scan_for_sitemap_references;
use crate::discovery::robots::extract_sitemap_urls;
use crate::discovery::sitemap::{SitemapDocument, parse_sitemap};
use crate::discovery::CancelToken;
use crate::fetcher::{FetchResponse, Fetcher};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Which route through the discovery run produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// A candidate path answered `200` directly.
    Direct,
    /// A candidate answered `403` and the other scheme answered `200`.
    ProtocolFallback,
    /// Declared by a `Sitemap:` line in robots.txt.
    RobotsTxt,
    /// Referenced from the homepage markup.
    Homepage,
}

impl ResultOrigin {
    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ProtocolFallback => "protocol fallback",
            Self::RobotsTxt => "robots.txt",
            Self::Homepage => "homepage",
        }
    }
}

impl fmt::Display for ResultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orchestrator state, emitted on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fetching the next candidate path.
    Probing,
    /// Fetching the sitemaps declared in robots.txt.
    RobotsExpansion,
    /// Parsing a candidate (or its scheme-flipped retry) as a sitemap.
    DirectFetch,
    /// Scanning the homepage after every candidate came up empty.
    HomepageFallback,
    /// Run finished, results handed back.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Probing => "probing",
            Self::RobotsExpansion => "robots_expansion",
            Self::DirectFetch => "direct_fetch",
            Self::HomepageFallback => "homepage_fallback",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    debug!(phase = %phase, "Entering phase");
}

/// One successfully fetched and parsed sitemap resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// URL the document was requested from.
    pub source_url: String,
    /// How the URL was reached.
    pub origin: ResultOrigin,
    /// Parsed content.
    pub document: SitemapDocument,
}

/// Parse and validate a base URL.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `base_url` is not an absolute `http` or
/// `https` URL.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("'{base_url}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl(format!(
            "'{base_url}': unsupported scheme '{other}'"
        ))),
    }
}

/// Origin used to retry a candidate that answered `403`.
///
/// `http` becomes `https` and anything else becomes `http`. Host, port and
/// credentials are kept; path, query and fragment are dropped, so candidates
/// resolve against the site root.
///
/// ```
/// use smap_core::discovery::flip_scheme;
/// use url::Url;
///
/// let base = Url::parse("http://example.com:8080/blog/").unwrap();
/// assert_eq!(flip_scheme(&base).unwrap().as_str(), "https://example.com:8080/");
/// ```
#[must_use]
pub fn flip_scheme(base: &Url) -> Option<Url> {
    let target = if base.scheme() == "http" { "https" } else { "http" };
    let mut flipped = base.clone();
    flipped.set_scheme(target).ok()?;
    flipped.set_path("/");
    flipped.set_query(None);
    flipped.set_fragment(None);
    Some(flipped)
}

/// Discovers the sitemaps a site publishes.
///
/// Holds one [`Fetcher`] for the whole run so every probe shares a
/// connection pool.
#[derive(Debug, Clone)]
pub struct Discoverer {
    fetcher: Fetcher,
    settings: DiscoveryConfig,
    /// Replaces [`flip_scheme`] as the origin for `403` retries.
    alternate_base: Option<Url>,
}

impl Discoverer {
    /// Build a discoverer (and its HTTP client) from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::from_config(&config.fetch)?,
            settings: config.discovery.clone(),
            alternate_base: None,
        })
    }

    /// Build a discoverer around an existing fetcher.
    #[must_use]
    pub const fn with_fetcher(fetcher: Fetcher, settings: DiscoveryConfig) -> Self {
        Self {
            fetcher,
            settings,
            alternate_base: None,
        }
    }

    #[cfg(test)]
    fn with_alternate_base(mut self, alternate: Url) -> Self {
        self.alternate_base = Some(alternate);
        self
    }

    /// Run discovery to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `base_url` is not an absolute
    /// `http`/`https` URL. Nothing else fails the run.
    pub async fn discover(&self, base_url: &str) -> Result<Vec<DiscoveryResult>> {
        self.discover_with_cancel(base_url, &CancelToken::new()).await
    }

    /// Run discovery until it completes or `cancel` fires.
    ///
    /// A cancelled run returns the results collected before cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `base_url` is not an absolute
    /// `http`/`https` URL.
    #[instrument(skip(self, cancel), fields(base_url = %base_url))]
    pub async fn discover_with_cancel(
        &self,
        base_url: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<DiscoveryResult>> {
        let base = parse_base_url(base_url)?;
        let mut results = Vec::new();

        for path in &self.settings.candidate_paths {
            if cancel.is_cancelled() {
                break;
            }
            enter(Phase::Probing);
            self.probe_candidate(&base, path, cancel, &mut results).await;
            if !self.pause(cancel).await {
                break;
            }
        }

        if results.is_empty() && self.settings.homepage_fallback && !cancel.is_cancelled() {
            enter(Phase::HomepageFallback);
            self.scan_homepage(&base, cancel, &mut results).await;
        }

        if cancel.is_cancelled() {
            info!(found = results.len(), "Discovery cancelled, returning partial results");
        }
        enter(Phase::Done);
        debug!(found = results.len(), "Discovery finished");
        Ok(results)
    }

    async fn probe_candidate(
        &self,
        base: &Url,
        path: &str,
        cancel: &CancelToken,
        results: &mut Vec<DiscoveryResult>,
    ) {
        let url = match base.join(path) {
            Ok(url) => url,
            Err(e) => {
                warn!(path = %path, error = %e, "Cannot build candidate URL, skipping");
                return;
            },
        };

        info!(url = %url, "Checking {url}");
        let Some(response) = self.fetch(url.as_str(), cancel).await else {
            return;
        };
        info!(url = %url, status = response.status, "Got response {}", response.status);

        match response.status {
            200 if path == ROBOTS_PATH => {
                enter(Phase::RobotsExpansion);
                self.expand_robots(&response.text(), cancel, results).await;
            },
            200 => {
                enter(Phase::DirectFetch);
                if let Some(document) = parse_response(url.as_str(), &response) {
                    results.push(DiscoveryResult {
                        source_url: url.to_string(),
                        origin: ResultOrigin::Direct,
                        document,
                    });
                }
            },
            403 => self.retry_flipped(base, path, cancel, results).await,
            status => debug!(url = %url, status, "Candidate not available"),
        }
    }

    /// One retry of a `403` candidate against the other scheme.
    async fn retry_flipped(
        &self,
        base: &Url,
        path: &str,
        cancel: &CancelToken,
        results: &mut Vec<DiscoveryResult>,
    ) {
        let alternate = self.alternate_base.clone().or_else(|| flip_scheme(base));
        let Some(alt_url) = alternate.and_then(|alt| alt.join(path).ok()) else {
            debug!(path = %path, "No alternate scheme URL for candidate");
            return;
        };

        info!(url = %alt_url, "Trying alternative protocol: {alt_url}");
        enter(Phase::DirectFetch);
        if let Some(document) = self.fetch_document(alt_url.as_str(), cancel).await {
            results.push(DiscoveryResult {
                source_url: alt_url.to_string(),
                origin: ResultOrigin::ProtocolFallback,
                document,
            });
        }
    }

    async fn expand_robots(
        &self,
        robots_txt: &str,
        cancel: &CancelToken,
        results: &mut Vec<DiscoveryResult>,
    ) {
        let declared = extract_sitemap_urls(robots_txt);
        debug!(count = declared.len(), "Sitemaps declared in robots.txt");

        for sitemap_url in declared {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(document) = self.fetch_document(&sitemap_url, cancel).await {
                results.push(DiscoveryResult {
                    source_url: sitemap_url,
                    origin: ResultOrigin::RobotsTxt,
                    document,
                });
            }
        }
    }

    async fn scan_homepage(
        &self,
        base: &Url,
        cancel: &CancelToken,
        results: &mut Vec<DiscoveryResult>,
    ) {
        info!(url = %base, "No sitemaps at conventional locations, scanning homepage");
        let Some(response) = self.fetch(base.as_str(), cancel).await else {
            return;
        };
        if !response.is_ok() {
            warn!(url = %base, status = response.status, "Homepage not available");
            return;
        }

        let references = scan_for_sitemap_references(
            &response.text(),
            base.as_str(),
            self.settings.candidate_paths.as_slice(),
        );
        debug!(count = references.len(), "Sitemap references found on homepage");

        for sitemap_url in references {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(document) = self.fetch_document(&sitemap_url, cancel).await {
                results.push(DiscoveryResult {
                    source_url: sitemap_url,
                    origin: ResultOrigin::Homepage,
                    document,
                });
            }
        }
    }

    /// Fetch, decode and parse one sitemap resource. Failures are logged.
    async fn fetch_document(&self, url: &str, cancel: &CancelToken) -> Option<SitemapDocument> {
        let response = self.fetch(url, cancel).await?;
        if !response.is_ok() {
            warn!(url = %url, status = response.status, "Sitemap not available, skipping");
            return None;
        }
        parse_response(url, &response)
    }

    /// Single GET that gives up as soon as `cancel` fires.
    async fn fetch(&self, url: &str, cancel: &CancelToken) -> Option<FetchResponse> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(url = %url, "Request abandoned after cancellation");
                None
            },
            result = self.fetcher.fetch(url) => match result {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(
                        url = %url,
                        error = %e,
                        category = e.category(),
                        recoverable = e.is_recoverable(),
                        "Request failed, skipping"
                    );
                    None
                },
            },
        }
    }

    /// Politeness delay. Returns `false` if the run was cancelled.
    async fn pause(&self, cancel: &CancelToken) -> bool {
        let delay = self.settings.probe_delay();
        if !delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(delay) => {},
                () = cancel.cancelled() => {},
            }
        }
        !cancel.is_cancelled()
    }
}

fn parse_response(url: &str, response: &FetchResponse) -> Option<SitemapDocument> {
    let parsed = decode(url, &response.headers, &response.body).and_then(|body| parse_sitemap(&body));
    match parsed {
        Ok(document) => {
            debug!(url = %url, kind = document.kind(), entries = document.len(), "Parsed sitemap");
            Some(document)
        },
        Err(e) => {
            warn!(url = %url, error = %e, category = e.category(), "Error processing sitemap, skipping");
            None
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LEAF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/a</loc></url>
  <url><loc>https://example.com/b</loc></url>
</urlset>"#;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.discovery.probe_delay_ms = 0;
        config.fetch.timeout_secs = 5;
        config
    }

    fn discoverer() -> Discoverer {
        Discoverer::new(&fast_config()).unwrap()
    }

    #[test]
    fn test_flip_scheme() {
        let http = Url::parse("http://example.com/blog/?page=2#top").unwrap();
        assert_eq!(flip_scheme(&http).unwrap().as_str(), "https://example.com/");

        let https = Url::parse("https://user@example.com:8443/docs").unwrap();
        assert_eq!(
            flip_scheme(&https).unwrap().as_str(),
            "http://user@example.com:8443/"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        assert!(parse_base_url("https://example.com").is_ok());
        assert!(matches!(
            parse_base_url("example.com"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_origin_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ResultOrigin::ProtocolFallback).unwrap(),
            r#""protocol_fallback""#
        );
        assert_eq!(ResultOrigin::RobotsTxt.to_string(), "robots.txt");
        assert_eq!(Phase::HomepageFallback.to_string(), "homepage_fallback");
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_the_only_error() {
        let result = discoverer().discover("not a url").await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_direct_hit_reuses_probe_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let results = discoverer().discover(&mock_server.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, ResultOrigin::Direct);
        assert_eq!(
            results[0].source_url,
            format!("{}/sitemap.xml", mock_server.uri())
        );
        assert_eq!(
            results[0].document.entries(),
            ["https://example.com/a", "https://example.com/b"]
        );
    }

    #[tokio::test]
    async fn test_forbidden_candidate_is_retried_once_then_skipped() {
        let mock_server = MockServer::start().await;

        // The https retry cannot reach a plain-http mock server, so it fails
        // as a transport error and discovery moves on.
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&mock_server)
            .await;

        let results = discoverer().discover(&mock_server.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].source_url.ends_with("/sitemap_index.xml"));
    }

    async fn alternate_pair(candidate: &str) -> (MockServer, MockServer, Discoverer) {
        let primary = MockServer::start().await;
        let alternate = MockServer::start().await;

        let mut config = fast_config();
        config.discovery.candidate_paths = vec![candidate.to_string()];
        config.discovery.homepage_fallback = false;
        let discoverer = Discoverer::new(&config)
            .unwrap()
            .with_alternate_base(Url::parse(&alternate.uri()).unwrap());
        (primary, alternate, discoverer)
    }

    #[tokio::test]
    async fn test_forbidden_candidate_found_on_alternate_scheme() {
        let (primary, alternate, discoverer) = alternate_pair("sitemap.xml").await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&alternate)
            .await;

        let results = discoverer.discover(&primary.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, ResultOrigin::ProtocolFallback);
        assert_eq!(results[0].source_url, format!("{}/sitemap.xml", alternate.uri()));
        assert_eq!(results[0].document.len(), 2);
    }

    #[tokio::test]
    async fn test_forbidden_on_both_schemes_is_not_retried_again() {
        let (primary, alternate, discoverer) = alternate_pair("sitemap.xml").await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&alternate)
            .await;

        let results = discoverer.discover(&primary.uri()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_robots_retry_is_parsed_as_sitemap() {
        let (primary, alternate, discoverer) = alternate_pair("robots.txt").await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&alternate)
            .await;

        let results = discoverer.discover(&primary.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, ResultOrigin::ProtocolFallback);
        assert!(!results[0].document.is_index());
    }

    #[tokio::test]
    async fn test_homepage_scanned_once_when_nothing_found() {
        let mock_server = MockServer::start().await;
        let html = format!(
            "<html>\n<link rel=\"sitemap\" href=\"{}/maps/sitemap.xml\">\n</html>",
            mock_server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&mock_server)
            .await;

        let results = discoverer().discover(&mock_server.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, ResultOrigin::Homepage);
        assert!(results[0].source_url.ends_with("/maps/sitemap.xml"));
    }

    #[tokio::test]
    async fn test_homepage_fallback_can_be_disabled() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut config = fast_config();
        config.discovery.homepage_fallback = false;
        let results = Discoverer::new(&config)
            .unwrap()
            .discover(&mock_server.uri())
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_sitemap_is_skipped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<urlset><url>"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .mount(&mock_server)
            .await;

        let results = discoverer().discover(&mock_server.uri()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].source_url.ends_with("/sitemap-index.xml"));
    }

    #[tokio::test]
    async fn test_custom_candidate_list_is_respected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(0)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/custom/map.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = fast_config();
        config.discovery.candidate_paths = vec!["custom/map.xml".into()];
        let results = Discoverer::new(&config)
            .unwrap()
            .discover(&mock_server.uri())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_issues_no_requests() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(0)
            .mount(&mock_server)
            .await;

        let cancel = CancelToken::new();
        cancel.cancel();
        let results = discoverer()
            .discover_with_cancel(&mock_server.uri(), &cancel)
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_delay_keeps_partial_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LEAF))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut config = fast_config();
        config.discovery.probe_delay_ms = 5_000;
        let discoverer = Discoverer::new(&config).unwrap();

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let results = discoverer
            .discover_with_cancel(&mock_server.uri(), &cancel)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, ResultOrigin::Direct);
    }
}
