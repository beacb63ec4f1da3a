//! TMDB API client
//!
//! Performs the single authenticated GET issued on a cache miss. Response
//! bodies are returned untouched; interpreting them is left to the caller.

use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Base URL for the TMDB v3 API
pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Locale requested for every upstream call
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Errors that can occur when fetching from upstream
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with something other than 200
    #[error("API returned status code {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a complete response (DNS, connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The configured base URL cannot have endpoint paths appended to it
#[derive(Debug, Error)]
#[error("Invalid upstream base URL '{url}': {reason}")]
pub struct BaseUrlError {
    url: String,
    reason: String,
}

/// Client for the TMDB TV endpoints
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
    token: String,
    language: String,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    /// Create a new client for `base_url` authenticating with `token`
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, BaseUrlError> {
        let parsed = Url::parse(base_url).map_err(|e| BaseUrlError {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(BaseUrlError {
                url: base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        Ok(Self {
            client: Client::new(),
            base_url: parsed,
            token: token.into(),
            language: DEFAULT_LANGUAGE.to_string(),
        })
    }

    /// Request a different locale
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL of the TV search endpoint for `query`
    ///
    /// Adult content is excluded and only the first page is requested. The
    /// query is form-encoded, so spaces become `+`.
    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoint(&["search", "tv"]);
        url.query_pairs_mut()
            .append_pair("include_adult", "false")
            .append_pair("language", &self.language)
            .append_pair("page", "1")
            .append_pair("query", query);
        url
    }

    /// URL of the TV detail endpoint for `id`
    pub fn detail_url(&self, id: i64) -> Url {
        let mut url = self.endpoint(&["tv", &id.to_string()]);
        url.query_pairs_mut().append_pair("language", &self.language);
        url
    }

    /// Fetch `url` with the bearer credential and return the raw body
    ///
    /// # Returns
    /// * `Ok(Bytes)` - The complete body of a 200 response
    /// * `Err(FetchError::Status)` - Any other status, with the body text
    /// * `Err(FetchError::Transport)` - If the request or body read fails
    pub async fn fetch(&self, url: Url) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}
