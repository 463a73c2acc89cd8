//! Google Books HTTP client
//!
//! Every lookup goes through the shared [`ResponseCache`]. Failures are logged
//! and reported as "no data" so one broken provider never aborts enrichment.

use serde_json::json;

use super::{adapter, dto};
use crate::enrichment::cache::{CachePolicy, ResponseCache};
use crate::enrichment::domain::{BookRecord, SearchQuery};
use crate::enrichment::error::{ApiError, ProviderError};
use crate::enrichment::http;

/// Provider name used in logs and errors
pub const PROVIDER: &str = "Google Books";

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// The API rejects `maxResults` above 40
const MAX_RESULTS: usize = 40;

const GET_BOOK_DATA: &str = concat!(module_path!(), "::GoogleBooksClient::get_book_data");
const SEARCH_BOOKS: &str = concat!(module_path!(), "::GoogleBooksClient::search_books");

/// Google Books API client
pub struct GoogleBooksClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: ResponseCache,
    policy: CachePolicy,
}

impl GoogleBooksClient {
    /// Create a client talking to the public API.
    pub fn new(http_client: reqwest::Client, cache: ResponseCache, policy: CachePolicy) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            cache,
            policy,
        }
    }

    /// Send this key with every request (optional for Google Books).
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Point the client at another server (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Volume info for an ISBN, or `None` if unknown or the request failed.
    pub async fn get_book_data(&self, isbn: &str) -> Option<dto::VolumeInfo> {
        let result: Result<Option<dto::VolumeInfo>, ProviderError> = self
            .cache
            .cached_call(GET_BOOK_DATA, &json!({ "isbn": isbn }), self.policy, || async {
                self.fetch_volume(isbn).await.map_err(ProviderError::from)
            })
            .await;

        match result {
            Ok(info) => {
                if info.is_none() {
                    tracing::debug!(provider = PROVIDER, isbn, "No volume found");
                }
                info
            }
            Err(e) => {
                tracing::error!(provider = PROVIDER, isbn, error = %e, "Failed to fetch book data");
                None
            }
        }
    }

    /// Volumes matching the search criteria (at most `min(limit, 40)`).
    pub async fn search_books(&self, query: &SearchQuery) -> Vec<dto::VolumeInfo> {
        let Some(q) = build_query(query) else {
            return Vec::new();
        };
        let limit = query.limit.min(MAX_RESULTS);
        if limit == 0 {
            return Vec::new();
        }

        let result: Result<Vec<dto::VolumeInfo>, ProviderError> = self
            .cache
            .cached_call(SEARCH_BOOKS, &json!({ "q": q, "limit": limit }), self.policy, || async {
                self.fetch_search(&q, limit).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::error!(provider = PROVIDER, query = %q, error = %e, "Search failed");
            Vec::new()
        })
    }

    /// Convert a volume into a [`BookRecord`]; see [`adapter::to_record`].
    pub fn to_enrichment_data(&self, info: &dto::VolumeInfo, fallback_isbn: &str) -> BookRecord {
        adapter::to_record(info, fallback_isbn)
    }

    /// Forget the cached lookup for an ISBN.
    pub async fn clear_cached_book(&self, isbn: &str) {
        if let Err(e) = self
            .cache
            .invalidate_call(GET_BOOK_DATA, &json!({ "isbn": isbn }))
            .await
        {
            tracing::warn!(provider = PROVIDER, isbn, error = %e, "Failed to clear cache entry");
        }
    }

    async fn fetch_volume(&self, isbn: &str) -> Result<Option<dto::VolumeInfo>, ApiError> {
        let mut params = vec![("q", format!("isbn:{isbn}")), ("maxResults", "1".to_string())];
        self.push_key(&mut params);

        let response = self.send_volumes_request(&params).await?;
        Ok(response
            .and_then(|r| r.items.into_iter().next())
            .map(|v| v.volume_info))
    }

    async fn fetch_search(&self, q: &str, limit: usize) -> Result<Vec<dto::VolumeInfo>, ApiError> {
        let mut params = vec![("q", q.to_string()), ("maxResults", limit.to_string())];
        self.push_key(&mut params);

        let response = self.send_volumes_request(&params).await?;
        Ok(response
            .map(|r| r.items.into_iter().map(|v| v.volume_info).collect())
            .unwrap_or_default())
    }

    async fn send_volumes_request(
        &self,
        params: &[(&str, String)],
    ) -> Result<Option<dto::VolumesResponse>, ApiError> {
        let url = format!("{}/volumes", self.base_url);
        http::get_json(&self.http_client, PROVIDER, &url, params).await
    }

    fn push_key(&self, params: &mut Vec<(&str, String)>) {
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
    }
}

/// Build the `q` parameter from field-qualified criteria.
///
/// Returns `None` when no criterion is set.
fn build_query(query: &SearchQuery) -> Option<String> {
    let mut parts = Vec::new();
    if !query.query.is_empty() {
        parts.push(query.query.clone());
    }
    if !query.title.is_empty() {
        parts.push(format!("intitle:{}", query.title));
    }
    for author in query.effective_authors() {
        parts.push(format!("inauthor:{author}"));
    }
    if !query.publisher.is_empty() {
        parts.push(format!("inpublisher:{}", query.publisher));
    }
    if !query.subject.is_empty() {
        parts.push(format!("subject:{}", query.subject));
    }
    if !query.isbn.is_empty() {
        parts.push(format!("isbn:{}", query.isbn));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
