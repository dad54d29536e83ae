//! Sitemap discovery for a website.
//!
//! Given a base URL, [`Discoverer`] probes the conventional sitemap locations,
//! expands `robots.txt` declarations, retries access-denied probes over the
//! other scheme, and finally scans the homepage markup when nothing else
//! turned up.
//!
//! ## Quick Start
//!
//! ```no_run
//! use smap_core::{Config, Discoverer};
//!
//! # async fn example() -> smap_core::Result<()> {
//! let discoverer = Discoverer::new(&Config::default())?;
//! let results = discoverer.discover("https://example.com").await?;
//!
//! for result in &results {
//!     println!("{} ({} entries)", result.source_url, result.document.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Probe Order
//!
//! 1. `sitemap.xml`, `sitemap_index.xml`, `sitemap-index.xml`,
//!    `sitemap_index.xml.gz`, `sitemap.xml.gz` are parsed directly
//! 2. `robots.txt`: every `Sitemap:` URL it declares is fetched and parsed
//! 3. Homepage scan, only if steps 1 and 2 produced nothing
//!
//! A `403` on any candidate is retried once against the same path with the
//! scheme flipped (`http` and `https`).

pub mod html;
pub mod probe;
pub mod robots;
pub mod sitemap;

pub use html::scan_for_sitemap_references;
pub use probe::{Discoverer, DiscoveryResult, Phase, ResultOrigin, flip_scheme};
pub use robots::extract_sitemap_urls;
pub use sitemap::{SITEMAP_NAMESPACE, SitemapDocument, parse_sitemap};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Cooperative cancellation handle for a discovery run.
///
/// Clones share state: cancelling any clone cancels them all. A cancelled run
/// stops before its next request and returns the results gathered so far.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every task waiting in [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        // Registered before the flag check so a concurrent cancel() is not missed
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
