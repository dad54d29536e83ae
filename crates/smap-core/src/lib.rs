//! # smap-core
//!
//! Core functionality for smap - finds and enumerates the sitemaps a website
//! publishes, starting from nothing but its base URL.
//!
//! ## Architecture
//!
//! The crate is organized leaf-first:
//!
//! - **Fetching**: one shared HTTP client with a fixed identity and timeout
//! - **Decoding**: gzip detection and decompression of fetched bodies
//! - **Parsing**: sitemap XML into index or leaf documents
//! - **Discovery**: the probing strategy, robots.txt expansion, protocol
//!   fallback and homepage scanning
//! - **Configuration**: TOML settings with defaults for every field
//!
//! ## Quick Start
//!
//! ```no_run
//! use smap_core::{Config, Discoverer, SitemapDocument};
//!
//! # async fn example() -> smap_core::Result<()> {
//! let config = Config::load()?;
//! let discoverer = Discoverer::new(&config)?;
//!
//! for result in discoverer.discover("https://example.com").await? {
//!     match &result.document {
//!         SitemapDocument::Index { sitemaps } => {
//!             println!("{}: index of {} sitemaps", result.source_url, sitemaps.len());
//!         },
//!         SitemapDocument::Leaf { urls } => {
//!             println!("{}: {} URLs", result.source_url, urls.len());
//!         },
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Discovery is best-effort: failures on individual candidates are logged
//! through `tracing` and skipped. The only error a run returns is an
//! unusable base URL:
//!
//! ```rust
//! use smap_core::{Config, Discoverer, Error};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> smap_core::Result<()> {
//! let discoverer = Discoverer::new(&Config::default())?;
//! match discoverer.discover("ftp://example.com").await {
//!     Err(Error::InvalidUrl(msg)) => eprintln!("bad input: {msg}"),
//!     Err(e) => eprintln!("unexpected: {e}"),
//!     Ok(results) => println!("found {}", results.len()),
//! }
//! # Ok(())
//! # }
//! ```

/// Configuration loading and defaults
pub mod config;
/// Gzip detection and decompression
pub mod decode;
/// Sitemap discovery, parsing and extraction
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// HTTP fetching with a shared client
pub mod fetcher;

// Re-export commonly used types
pub use config::{Config, DiscoveryConfig, DisplayConfig, FetchConfig};
pub use discovery::probe::parse_base_url;
pub use discovery::{CancelToken, Discoverer, DiscoveryResult, ResultOrigin, SitemapDocument};
pub use error::{Error, Result};
pub use fetcher::{FetchResponse, Fetcher};
