//! HTTPS downloads of installer scripts.
use anyhow::{Context as _, Result};

/// Downloads a text resource.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not UTF-8.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// [`Fetcher`] backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("fetch: {url}");
        ureq::get(url)
            .call()
            .with_context(|| format!("failed to download {url}"))?
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed to read {url}"))
    }
}
