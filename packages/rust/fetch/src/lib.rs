//! Source document fetching.
//!
//! The extraction pipeline only ever sees documents through the
//! [`DocumentFetcher`] trait: give it an absolute URL, get back the raw body.
//! [`HttpFetcher`] is the production implementation; tests plug in
//! in-memory fetchers. [`SourceLocator`] turns configured paths and table
//! hyperlinks into absolute URLs.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use herbgraph_shared::{HerbGraphError, Result, SourcesConfig};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of redirects to follow per document.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (20 MB). Listing pages are large.
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// User-Agent string for document requests.
const USER_AGENT: &str = concat!("herbgraph/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchedDocument
// ---------------------------------------------------------------------------

/// A raw document as returned by a fetcher.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// The URL that was requested.
    pub url: Url,
    /// HTTP status code (200 for non-HTTP fetchers).
    pub status: u16,
    /// Raw body text.
    pub body: String,
    /// SHA-256 of the body, hex encoded.
    pub content_hash: String,
    /// When the body was received.
    pub fetched_at: DateTime<Utc>,
}

impl FetchedDocument {
    /// Wrap a body, computing its content hash.
    pub fn new(url: Url, status: u16, body: String) -> Self {
        let content_hash = {
            let mut hasher = Sha256::new();
            hasher.update(body.as_bytes());
            format!("{:x}", hasher.finalize())
        };

        Self {
            url,
            status,
            body,
            content_hash,
            fetched_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentFetcher
// ---------------------------------------------------------------------------

/// fetch(url) → raw document.
pub trait DocumentFetcher: Send + Sync {
    /// Fetch one document. Any failure is reported as an error; callers decide
    /// whether it is isolated or fatal.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedDocument>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Fetches documents over HTTP(S) with one shared client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HerbGraphError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Build a fetcher from the `[sources]` config section.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        Self::new(config.timeout_secs)
    }
}

impl DocumentFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| HerbGraphError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HerbGraphError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(HerbGraphError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| HerbGraphError::Network(format!("{url}: failed to read body: {e}")))?;

        debug!(bytes = body.len(), "document fetched");

        Ok(FetchedDocument::new(url.clone(), status.as_u16(), body))
    }
}

// ---------------------------------------------------------------------------
// SourceLocator
// ---------------------------------------------------------------------------

/// Resolves configured document paths and in-table hyperlinks to absolute URLs.
#[derive(Debug, Clone)]
pub struct SourceLocator {
    base: Url,
    herbs_path: String,
    adverse_effects_path: String,
}

impl SourceLocator {
    /// Build from the `[sources]` config section.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            HerbGraphError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;

        Ok(Self {
            base,
            herbs_path: config.herbs_path.clone(),
            adverse_effects_path: config.adverse_effects_path.clone(),
        })
    }

    /// The origin every link is resolved against.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a path or href against the base URL.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        self.base
            .join(href)
            .map_err(|e| HerbGraphError::validation(format!("cannot resolve '{href}': {e}")))
    }

    /// URL of the primary herbs-and-effects listing.
    pub fn herbs_url(&self) -> Result<Url> {
        self.resolve(&self.herbs_path)
    }

    /// URL of the secondary adverse-effects listing.
    pub fn adverse_effects_url(&self) -> Result<Url> {
        self.resolve(&self.adverse_effects_path)
    }
}
