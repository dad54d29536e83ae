//! Gzip detection and decompression for fetched sitemap bodies.
//!
//! A body is treated as gzip when the URL path ends in `.gz` or the server
//! labels it with a gzip media type. Such a body must decompress cleanly:
//! compressed bytes are never handed to the XML parser.

use crate::{Error, Result};
use flate2::read::GzDecoder;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::borrow::Cow;
use std::io::Read;

const GZIP_MEDIA_TYPES: [&str; 2] = ["application/x-gzip", "application/gzip"];

/// Whether a response body should be gunzipped before parsing.
#[must_use]
pub fn is_gzip(url: &str, headers: &HeaderMap) -> bool {
    url_has_gz_suffix(url) || has_gzip_content_type(headers)
}

/// Decompress `body` if [`is_gzip`] says so, otherwise borrow it unchanged.
pub fn decode<'a>(url: &str, headers: &HeaderMap, body: &'a [u8]) -> Result<Cow<'a, [u8]>> {
    if !is_gzip(url, headers) {
        return Ok(Cow::Borrowed(body));
    }

    let mut decoder = GzDecoder::new(body);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decompression(format!("{url}: {e}")))?;
    tracing::debug!(url = %url, compressed = body.len(), decompressed = out.len(), "Gunzipped body");
    Ok(Cow::Owned(out))
}

fn url_has_gz_suffix(url: &str) -> bool {
    let path = url::Url::parse(url).map_or_else(
        |_| url.split(['?', '#']).next().unwrap_or(url).to_string(),
        |parsed| parsed.path().to_string(),
    );
    path.to_ascii_lowercase().ends_with(".gz")
}

fn has_gzip_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| {
            let media = media.trim();
            GZIP_MEDIA_TYPES
                .iter()
                .any(|known| media.eq_ignore_ascii_case(known))
        })
}
