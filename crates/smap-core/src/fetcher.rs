use crate::config::FetchConfig;
use crate::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::debug;

/// HTTP client shared by every probe of a discovery run.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with the default identity, timeout and redirect policy
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    /// Creates a fetcher from explicit settings
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = build_client(&config.user_agent, config.timeout(), config.max_redirects)?;
        Ok(Self { client })
    }

    /// Creates a fetcher with a custom request timeout (primarily for tests)
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let defaults = FetchConfig::default();
        let client = build_client(&defaults.user_agent, timeout, defaults.max_redirects)?;
        Ok(Self { client })
    }

    /// Performs one GET, following redirects.
    ///
    /// Any status code is a successful fetch at this layer; deciding what a
    /// 403 or 404 means is left to the caller. Timeouts surface as
    /// [`Error::Timeout`], every other transport failure as [`Error::Network`].
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?
            .to_vec();

        debug!(url = %url, final_url = %final_url, status, bytes = body.len(), "Fetched");

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

fn build_client(user_agent: &str, timeout: Duration, max_redirects: usize) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(redirect::Policy::limited(max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(Error::Network)
}

fn transport_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("request to '{url}' timed out"))
    } else {
        Error::Network(err)
    }
}

/// Status, headers and raw body of a completed request
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL of the final hop after redirects
    pub url: String,
    /// HTTP status code of the final hop
    pub status: u16,
    /// Response headers of the final hop
    pub headers: HeaderMap,
    /// Raw body bytes (transfer encodings already removed)
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the server answered exactly `200 OK`
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body as text, replacing invalid UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// Note: Default is not implemented as Fetcher::new() can fail.
