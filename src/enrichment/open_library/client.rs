//! Open Library HTTP client
//!
//! Search results only carry ISBNs, so each hit is fetched again through
//! [`OpenLibraryClient::get_book_data`]. Editions reference authors by key;
//! [`OpenLibraryClient::to_enrichment_data`] resolves them with one extra
//! (cached) request per author.

use std::collections::BTreeMap;

use serde_json::json;

use super::{adapter, dto};
use crate::enrichment::cache::{CachePolicy, ResponseCache};
use crate::enrichment::domain::{BookRecord, SearchQuery};
use crate::enrichment::error::{ApiError, ProviderError};
use crate::enrichment::http;

/// Provider name used in logs and errors
pub const PROVIDER: &str = "Open Library";

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

/// Upper bound for `limit` on `/search.json`
const MAX_RESULTS: usize = 100;

const GET_BOOK_DATA: &str = concat!(module_path!(), "::OpenLibraryClient::get_book_data");
const SEARCH_BOOKS: &str = concat!(module_path!(), "::OpenLibraryClient::search_books");
const SEARCH_BY_ISBN: &str = concat!(module_path!(), "::OpenLibraryClient::search_by_isbn");
const GET_AUTHOR_NAME: &str = concat!(module_path!(), "::OpenLibraryClient::get_author_name");

/// Open Library API client
pub struct OpenLibraryClient {
    http_client: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
    policy: CachePolicy,
}

impl OpenLibraryClient {
    pub fn new(http_client: reqwest::Client, cache: ResponseCache, policy: CachePolicy) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache,
            policy,
        }
    }

    /// Point the client at another server (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Edition data for an ISBN, or `None` if unknown or the request failed.
    pub async fn get_book_data(&self, isbn: &str) -> Option<dto::Edition> {
        let result: Result<Option<dto::Edition>, ProviderError> = self
            .cache
            .cached_call(GET_BOOK_DATA, &json!({ "isbn": isbn }), self.policy, || async {
                self.fetch_edition(isbn).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::error!(provider = PROVIDER, isbn, error = %e, "Failed to fetch book data");
            None
        })
    }

    /// Editions matching the search criteria.
    ///
    /// An ISBN criterion uses the books API directly; anything else runs a
    /// catalog search and fetches the first ISBN of each hit.
    pub async fn search_books(&self, query: &SearchQuery) -> Vec<dto::Edition> {
        if !query.isbn.is_empty() {
            return self.search_by_isbn(&query.isbn).await;
        }

        let Some(q) = build_query(query) else {
            return Vec::new();
        };
        let limit = query.limit.min(MAX_RESULTS);
        if limit == 0 {
            return Vec::new();
        }

        let result: Result<Vec<dto::SearchDoc>, ProviderError> = self
            .cache
            .cached_call(SEARCH_BOOKS, &json!({ "q": q, "limit": limit }), self.policy, || async {
                self.fetch_search(&q, limit).await.map_err(ProviderError::from)
            })
            .await;

        let docs = match result {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(provider = PROVIDER, query = %q, error = %e, "Search failed");
                return Vec::new();
            }
        };

        let mut editions = Vec::new();
        for isbn in docs.iter().filter_map(|doc| doc.isbn.first()) {
            if let Some(edition) = self.get_book_data(isbn).await {
                editions.push(edition);
            }
        }
        editions
    }

    /// Convert an edition into a [`BookRecord`], resolving author keys.
    ///
    /// Editions without a title yield `None` before any author lookup.
    pub async fn to_enrichment_data(&self, edition: &dto::Edition, fallback_isbn: &str) -> Option<BookRecord> {
        if edition.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            tracing::debug!(provider = PROVIDER, key = ?edition.key, "Skipping edition without title");
            return None;
        }

        let mut authors = Vec::new();
        for author in &edition.authors {
            let name = match author.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => Some(name.to_string()),
                None => match author.author_key() {
                    Some(key) => self.get_author_name(key).await,
                    None => None,
                },
            };
            if let Some(name) = name {
                authors.push(name);
            }
        }

        adapter::to_record(edition, fallback_isbn, authors)
    }

    /// Resolve an author key such as `/authors/OL34184A` to a display name.
    pub async fn get_author_name(&self, key: &str) -> Option<String> {
        let result: Result<Option<String>, ProviderError> = self
            .cache
            .cached_call(GET_AUTHOR_NAME, &json!({ "key": key }), self.policy, || async {
                self.fetch_author_name(key).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::warn!(provider = PROVIDER, key, error = %e, "Failed to resolve author");
            None
        })
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

    async fn search_by_isbn(&self, isbn: &str) -> Vec<dto::Edition> {
        let result: Result<Vec<dto::Edition>, ProviderError> = self
            .cache
            .cached_call(SEARCH_BY_ISBN, &json!({ "isbn": isbn }), self.policy, || async {
                self.fetch_books_api(isbn).await.map_err(ProviderError::from)
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::error!(provider = PROVIDER, isbn, error = %e, "ISBN search failed");
            Vec::new()
        })
    }

    async fn fetch_edition(&self, isbn: &str) -> Result<Option<dto::Edition>, ApiError> {
        let url = format!("{}/isbn/{}.json", self.base_url, http::path_segment(isbn));
        http::get_json(&self.http_client, PROVIDER, &url, &[]).await
    }

    async fn fetch_search(&self, q: &str, limit: usize) -> Result<Vec<dto::SearchDoc>, ApiError> {
        let url = format!("{}/search.json", self.base_url);
        let params = [("q", q.to_string()), ("limit", limit.to_string())];
        let response: Option<dto::SearchResponse> =
            http::get_json(&self.http_client, PROVIDER, &url, &params).await?;
        Ok(response.map(|r| r.docs).unwrap_or_default())
    }

    async fn fetch_books_api(&self, isbn: &str) -> Result<Vec<dto::Edition>, ApiError> {
        let url = format!("{}/api/books", self.base_url);
        let params = [
            ("bibkeys", format!("ISBN:{isbn}")),
            ("format", "json".to_string()),
            ("jscmd", "data".to_string()),
        ];
        let response: Option<BTreeMap<String, dto::Edition>> =
            http::get_json(&self.http_client, PROVIDER, &url, &params).await?;
        Ok(response.map(|r| r.into_values().collect()).unwrap_or_default())
    }

    async fn fetch_author_name(&self, key: &str) -> Result<Option<String>, ApiError> {
        let url = format!("{}{}.json", self.base_url, key);
        let author: Option<dto::Author> = http::get_json(&self.http_client, PROVIDER, &url, &[]).await?;
        Ok(author.and_then(|a| a.name.or(a.personal_name)))
    }
}

/// Build the `q` parameter: the free-text query, else `title:`/`author:` parts.
fn build_query(query: &SearchQuery) -> Option<String> {
    if !query.query.is_empty() {
        return Some(query.query.clone());
    }

    let mut parts = Vec::new();
    if !query.title.is_empty() {
        parts.push(format!("title:{}", query.title));
    }
    for author in query.effective_authors() {
        parts.push(format!("author:{author}"));
    }
    if !query.publisher.is_empty() {
        parts.push(format!("publisher:{}", query.publisher));
    }
    if !query.subject.is_empty() {
        parts.push(format!("subject:{}", query.subject));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const FOX: &str = r#"{
        "title": "Fantastic Mr. Fox",
        "authors": [{"key": "/authors/OL34184A"}],
        "isbn_13": ["9780140328721"],
        "covers": [8739161]
    }"#;

    fn client(server: &mockito::Server) -> OpenLibraryClient {
        let http = http::build_client(http::DEFAULT_TIMEOUT, http::USER_AGENT).unwrap();
        OpenLibraryClient::new(http, ResponseCache::new(100), CachePolicy::default())
            .with_base_url(server.url())
    }

    #[test]
    fn test_build_query() {
        let query = SearchQuery {
            title: "Fox".to_string(),
            author: "Dahl".to_string(),
            ..Default::default()
        };
        assert_eq!(build_query(&query).unwrap(), "title:Fox author:Dahl");
        assert_eq!(build_query(&SearchQuery::text("fox")).unwrap(), "fox");
        assert!(build_query(&SearchQuery::default()).is_none());
    }

    #[tokio::test]
    async fn test_get_book_data_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/isbn/9780140328721.json")
            .with_status(200)
            .with_body(FOX)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server);
        assert!(client.get_book_data("9780140328721").await.is_some());
        assert!(client.get_book_data("9780140328721").await.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_isbn_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/isbn/0000000000.json")
            .with_status(404)
            .create_async()
            .await;

        assert!(client(&server).get_book_data("0000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_to_enrichment_data_resolves_author_keys() {
        let mut server = mockito::Server::new_async().await;
        let author = server
            .mock("GET", "/authors/OL34184A.json")
            .with_status(200)
            .with_body(r#"{"name": "Roald Dahl"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server);
        let edition: dto::Edition = serde_json::from_str(FOX).unwrap();
        let record = client.to_enrichment_data(&edition, "").await.unwrap();
        let again = client.to_enrichment_data(&edition, "").await.unwrap();

        assert_eq!(record.authors, vec!["Roald Dahl"]);
        assert_eq!(again.authors, vec!["Roald Dahl"]);
        assert_eq!(record.isbn, "9780140328721");
        author.assert_async().await;
    }

    #[tokio::test]
    async fn test_unresolvable_author_is_skipped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/authors/OL34184A.json")
            .with_status(500)
            .create_async()
            .await;

        let edition: dto::Edition = serde_json::from_str(FOX).unwrap();
        let record = client(&server).to_enrichment_data(&edition, "").await.unwrap();
        assert!(record.authors.is_empty());
        assert_eq!(record.title.as_deref(), Some("Fantastic Mr. Fox"));
    }

    #[tokio::test]
    async fn test_untitled_edition_skips_author_lookup() {
        let mut server = mockito::Server::new_async().await;
        let author = server
            .mock("GET", "/authors/OL34184A.json")
            .expect(0)
            .create_async()
            .await;

        let edition: dto::Edition =
            serde_json::from_str(r#"{"authors": [{"key": "/authors/OL34184A"}], "isbn_13": ["9780140328721"]}"#)
                .unwrap();
        assert!(client(&server).to_enrichment_data(&edition, "").await.is_none());
        author.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_fetches_each_hit() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/search.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "title:Fox".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"numFound": 2, "docs": [{"isbn": ["9780140328721", "0140328726"]}, {"title": "No ISBN"}]}"#)
            .create_async()
            .await;
        let edition = server
            .mock("GET", "/isbn/9780140328721.json")
            .with_status(200)
            .with_body(FOX)
            .create_async()
            .await;

        let query = SearchQuery {
            title: "Fox".to_string(),
            limit: 5,
            ..Default::default()
        };
        let results = client(&server).search_books(&query).await;

        assert_eq!(results.len(), 1);
        search.assert_async().await;
        edition.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_by_isbn_uses_books_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/books")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("bibkeys".into(), "ISBN:9780140328721".into()),
                Matcher::UrlEncoded("jscmd".into(), "data".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ISBN:9780140328721": {"title": "Fantastic Mr. Fox", "authors": [{"name": "Roald Dahl"}]}}"#)
            .create_async()
            .await;

        let query = SearchQuery {
            isbn: "9780140328721".to_string(),
            ..Default::default()
        };
        let results = client(&server).search_books(&query).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title.as_deref(), Some("Fantastic Mr. Fox"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_caps_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
            .with_status(200)
            .with_body(r#"{"numFound": 0, "docs": []}"#)
            .create_async()
            .await;

        let query = SearchQuery::text("fox").with_limit(500);
        assert!(client(&server).search_books(&query).await.is_empty());
        mock.assert_async().await;
    }
}
