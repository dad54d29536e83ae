//! Error types and handling for smap-core operations.
//!
//! Every failure encountered while discovering sitemaps is represented by
//! [`Error`]. The discovery orchestrator never lets one of these abort a run:
//! a failing candidate or resource is logged and skipped. Only an unusable
//! base URL is returned to the caller.
//!
//! ## Error Families
//!
//! - **Transport**: [`Error::Timeout`], [`Error::Network`]
//! - **Parse**: [`Error::MalformedXml`], [`Error::Decompression`]
//! - **Setup**: [`Error::InvalidUrl`], [`Error::Config`]
//!
//! ```rust
//! use smap_core::Error;
//!
//! let err = Error::MalformedXml("unexpected end of input".to_string());
//! assert!(err.is_parse());
//! assert!(!err.is_transport());
//! assert_eq!(err.category(), "malformed_xml");
//! ```

use thiserror::Error;

/// The main error type for smap-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A request exceeded the configured per-request timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Network-level failure: DNS, refused connection, TLS, or body read.
    ///
    /// The underlying `reqwest::Error` is preserved so callers can inspect
    /// the connection details.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The document is not well-formed XML, even after lossy UTF-8 recovery.
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// A body flagged as gzip could not be decompressed.
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is a transport failure (timeout or network).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }

    /// Whether this is a content failure (malformed XML or bad gzip).
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::MalformedXml(_) | Self::Decompression(_))
    }

    /// Check if the error might succeed on a later attempt.
    ///
    /// Timeouts and connection failures are considered transient. Everything
    /// else (bad XML, bad URLs, bad config) will fail the same way again.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for structured logs.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::MalformedXml(_) => "malformed_xml",
            Self::Decompression(_) => "decompression",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Config(_) => "config",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unwrap_used,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_error_display_formatting() {
        let cases = vec![
            (Error::Timeout("10s elapsed".into()), "Timeout: 10s elapsed"),
            (
                Error::MalformedXml("mismatched tag".into()),
                "Malformed XML: mismatched tag",
            ),
            (
                Error::Decompression("invalid gzip header".into()),
                "Decompression failed: invalid gzip header",
            ),
            (
                Error::InvalidUrl("not a url".into()),
                "Invalid URL: not a url",
            ),
            (
                Error::Config("bad toml".into()),
                "Configuration error: bad toml",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_families() {
        assert!(Error::Timeout("t".into()).is_transport());
        assert!(!Error::Timeout("t".into()).is_parse());
        assert!(Error::MalformedXml("x".into()).is_parse());
        assert!(Error::Decompression("x".into()).is_parse());
        assert!(!Error::InvalidUrl("x".into()).is_transport());
        assert!(!Error::InvalidUrl("x".into()).is_parse());
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Error::Timeout("t".into()).is_recoverable());
        assert!(!Error::Decompression("x".into()).is_recoverable());
        assert!(!Error::InvalidUrl("x".into()).is_recoverable());
        assert!(!Error::MalformedXml("x".into()).is_recoverable());
        assert!(!Error::Config("x".into()).is_recoverable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(Error::Timeout(String::new()).category(), "timeout");
        assert_eq!(Error::MalformedXml(String::new()).category(), "malformed_xml");
        assert_eq!(Error::Decompression(String::new()).category(), "decompression");
        assert_eq!(Error::InvalidUrl(String::new()).category(), "invalid_url");
        assert_eq!(Error::Config(String::new()).category(), "config");
    }

    proptest! {
        #[test]
        fn test_malformed_xml_with_arbitrary_messages(msg in r".{0,500}") {
            let error = Error::MalformedXml(msg.clone());
            prop_assert_eq!(error.to_string(), format!("Malformed XML: {msg}"));
            prop_assert_eq!(error.category(), "malformed_xml");
        }
    }
}
