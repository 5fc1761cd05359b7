//! HTTP client for the Open Library JSON API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::models::{
    short_key, AuthorCandidate, AuthorSearchResponse, Work, WorkDetails, WorksResponse,
};
use crate::rate_limit::RateLimiter;
use crate::BibliographicSource;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from the Open Library HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum OpenLibraryError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Open Library returned a non-2xx status code.
    #[error("Open Library API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

/// Rate-limited client for one Open Library deployment.
pub struct OpenLibraryClient {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl OpenLibraryClient {
    /// Create a client for `base_url`, e.g. `https://openlibrary.org`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, OpenLibraryError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("libris/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(MIN_REQUEST_INTERVAL),
        }
    }

    /// Replace the minimum spacing between requests.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.limiter = RateLimiter::new(interval);
        self
    }

    /// `GET /search/authors.json?q={name}`
    pub async fn fetch_author_search(
        &self,
        name: &str,
    ) -> Result<AuthorSearchResponse, OpenLibraryError> {
        self.get_json("/search/authors.json", &[("q", name.to_string())])
            .await
    }

    /// `GET /authors/{key}/works.json?limit={limit}`
    pub async fn fetch_author_works(
        &self,
        author_key: &str,
        limit: usize,
    ) -> Result<WorksResponse, OpenLibraryError> {
        let path = format!("/authors/{}/works.json", short_key(author_key));
        self.get_json(&path, &[("limit", limit.to_string())]).await
    }

    /// `GET /works/{key}.json`
    pub async fn fetch_work_details(&self, work_key: &str) -> Result<WorkDetails, OpenLibraryError> {
        let path = format!("/works/{}.json", short_key(work_key));
        self.get_json(&path, &[]).await
    }

    // ---- private helpers ----

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, OpenLibraryError> {
        self.limiter.acquire().await;
        tracing::debug!(path, "Open Library request");

        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OpenLibraryError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BibliographicSource for OpenLibraryClient {
    async fn search_author(&self, name: &str) -> Option<AuthorCandidate> {
        match self.fetch_author_search(name).await {
            Ok(response) => response.docs.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, author = name, "Author search failed");
                None
            }
        }
    }

    async fn author_works(&self, author_key: &str, limit: usize) -> Vec<Work> {
        match self.fetch_author_works(author_key, limit).await {
            Ok(response) => {
                let mut works = response.entries;
                works.truncate(limit);
                works
            }
            Err(e) => {
                tracing::warn!(error = %e, author_key, "Fetching author works failed");
                Vec::new()
            }
        }
    }

    async fn work_details(&self, work_key: &str) -> Option<WorkDetails> {
        match self.fetch_work_details(work_key).await {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!(error = %e, work_key, "Fetching work details failed");
                None
            }
        }
    }
}
