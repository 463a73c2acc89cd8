//! NYT Books HTTP client

use serde_json::json;

use super::{adapter, dto};
use crate::enrichment::cache::{CachePolicy, ResponseCache};
use crate::enrichment::domain::BestsellerList;
use crate::enrichment::error::{ApiError, ProviderError};
use crate::enrichment::http;

/// Provider name used in logs and errors
pub const PROVIDER: &str = "NY Times";

pub const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc/books/v3";

/// List queried when none is named
pub const DEFAULT_LIST: &str = "hardcover-fiction";

const GET_BOOK_REVIEW: &str = concat!(module_path!(), "::NyTimesClient::get_book_review");
const GET_BESTSELLERS: &str = concat!(module_path!(), "::NyTimesClient::get_bestsellers");
const GET_BESTSELLER_LISTS: &str = concat!(module_path!(), "::NyTimesClient::get_bestseller_lists");

/// NYT Books API client
pub struct NyTimesClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: ResponseCache,
    policy: CachePolicy,
}

impl NyTimesClient {
    /// Create a client. Without an API key every call returns "no data".
    pub fn new(
        http_client: reqwest::Client,
        api_key: Option<String>,
        cache: ResponseCache,
        policy: CachePolicy,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(provider = PROVIDER, "No API key configured, reviews and bestsellers unavailable");
        }

        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            cache,
            policy,
        }
    }

    /// Point the client at another server (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Summary of the first review for an ISBN.
    pub async fn get_book_review(&self, isbn: &str) -> Option<String> {
        let api_key = self.api_key.as_deref()?;

        let result: Result<Option<String>, ProviderError> = self
            .cache
            .cached_call(GET_BOOK_REVIEW, &json!({ "isbn": isbn }), self.policy, || async {
                self.fetch_review(api_key, isbn).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::error!(provider = PROVIDER, isbn, error = %e, "Failed to fetch review");
            None
        })
    }

    /// Current edition of a bestseller list, e.g. `hardcover-fiction`.
    pub async fn get_bestsellers(&self, list_name: &str) -> Option<BestsellerList> {
        let api_key = self.api_key.as_deref()?;

        let result: Result<Option<dto::ListResults>, ProviderError> = self
            .cache
            .cached_call(GET_BESTSELLERS, &json!({ "list_name": list_name }), self.policy, || async {
                self.fetch_list(api_key, list_name).await.map_err(ProviderError::from)
            })
            .await;

        match result {
            Ok(results) => results.map(|r| adapter::to_bestseller_list(r, list_name)),
            Err(e) => {
                tracing::error!(provider = PROVIDER, list_name, error = %e, "Failed to fetch bestsellers");
                None
            }
        }
    }

    /// Encoded names of every available bestseller list.
    pub async fn get_bestseller_lists(&self) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };

        let result: Result<Vec<String>, ProviderError> = self
            .cache
            .cached_call(GET_BESTSELLER_LISTS, &(), self.policy, || async {
                self.fetch_list_names(api_key).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::error!(provider = PROVIDER, error = %e, "Failed to fetch list names");
            Vec::new()
        })
    }

    async fn fetch_review(&self, api_key: &str, isbn: &str) -> Result<Option<String>, ApiError> {
        let url = format!("{}/reviews.json", self.base_url);
        let params = [("isbn", isbn.to_string()), ("api-key", api_key.to_string())];
        let response: Option<dto::ReviewsResponse> =
            http::get_json(&self.http_client, PROVIDER, &url, &params).await?;

        Ok(response
            .filter(|r| r.num_results > 0)
            .and_then(|r| r.results.into_iter().next())
            .and_then(|review| review.summary)
            .filter(|summary| !summary.is_empty()))
    }

    async fn fetch_list(&self, api_key: &str, list_name: &str) -> Result<Option<dto::ListResults>, ApiError> {
        let url = format!(
            "{}/lists/current/{}.json",
            self.base_url,
            http::path_segment(list_name)
        );
        let params = [("api-key", api_key.to_string())];
        let response: Option<dto::ListResponse> =
            http::get_json(&self.http_client, PROVIDER, &url, &params).await?;
        Ok(response.and_then(|r| r.results))
    }

    async fn fetch_list_names(&self, api_key: &str) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/lists/names.json", self.base_url);
        let params = [("api-key", api_key.to_string())];
        let response: Option<dto::ListNamesResponse> =
            http::get_json(&self.http_client, PROVIDER, &url, &params).await?;

        Ok(response
            .map(|r| {
                r.results
                    .into_iter()
                    .filter_map(|list| list.list_name_encoded)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default())
    }
}
