// src/archive/fetch.rs
// =============================================================================
// Fetching bytes over HTTP.
//
// Key functionality:
// - Plain GET requests, one at a time, through a shared reqwest Client
// - Non-2xx responses are failures, like network errors are
// - Failures are categorized (timeout, redirect loop, HTTP status, network)
//
// The archiver talks to the network only through the `Fetch` trait, so tests
// can hand it an in-memory implementation instead of a real client.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ArchiveConfig;
use crate::markup::charset_param;

/// A successful response: the body and its declared content type.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Fetched {
    /// Body decoded as text, using the declared charset (UTF-8 otherwise).
    pub fn text(&self) -> String {
        let encoding = self
            .content_type
            .as_deref()
            .and_then(charset_param)
            .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
            .unwrap_or(encoding_rs::UTF_8);
        let (text, _, _) = encoding.decode(&self.bytes);
        text.into_owned()
    }
}

/// Why a fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Too many redirects (redirect loop)
    #[error("too many redirects fetching {url}")]
    TooManyRedirects { url: String },

    /// The server answered with a non-2xx status (404, 500 ...)
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// DNS, connection, TLS or body errors
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Something that can GET a URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// `Fetch` over a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds the client once; it is reused for every request of a run
    /// (connection pooling).
    pub fn new(config: &ArchiveConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(HttpFetcher { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client) -> Self {
        HttpFetcher { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| categorize_error(url, e))?
            .to_vec();

        debug!(url, bytes = bytes.len(), content_type = ?content_type, "fetched");
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

// Sorts reqwest errors into our categories
fn categorize_error(url: &str, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_redirect() {
        FetchError::TooManyRedirects { url }
    } else {
        FetchError::Network { url, source: error }
    }
}
