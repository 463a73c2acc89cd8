//! Enrichment service - orchestrates provider lookups for one book
//!
//! This is the high-level API for enriching books:
//! 1. Ask each book data provider, in priority order, for the ISBN
//! 2. Fold every answer into one record with the left-biased merge
//! 3. Attach a review summary from the reviews provider
//!
//! Providers are awaited one after another; a single call never fans out.
//! Each provider call is isolated, so a provider that fails (or panics)
//! only loses its own contribution.

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;

use super::cache::{CacheError, CachePolicy, ResponseCache};
use super::domain::{BookRecord, Identifier, SearchQuery, merge};
use super::traits::{BookDataProvider, ReviewProvider};

const ENRICH_BOOK_DATA: &str = concat!(module_path!(), "::EnrichmentService::enrich_book_data");

/// Configuration for the enrichment service
#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    /// Caching of whole enrichment results (on top of per-provider caching)
    pub cache_policy: CachePolicy,
}

/// Service for enriching book metadata from external sources
pub struct EnrichmentService {
    providers: Vec<Arc<dyn BookDataProvider>>,
    reviews: Arc<dyn ReviewProvider>,
    cache: ResponseCache,
    config: EnrichmentConfig,
}

impl EnrichmentService {
    /// Create a service over `providers`, queried in the given order.
    pub fn new(
        providers: Vec<Arc<dyn BookDataProvider>>,
        reviews: Arc<dyn ReviewProvider>,
        cache: ResponseCache,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            providers,
            reviews,
            cache,
            config,
        }
    }

    /// Names of the configured book data providers, in priority order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Merged metadata for one ISBN, or `None` if no provider knows it.
    ///
    /// The whole provider sequence is cached. Only cache failures are
    /// returned as errors.
    pub async fn enrich_book_data(&self, isbn: &str) -> Result<Option<BookRecord>, CacheError> {
        if isbn.trim().is_empty() {
            return Ok(None);
        }

        self.cache
            .cached_call(
                ENRICH_BOOK_DATA,
                &json!({ "isbn": isbn }),
                self.config.cache_policy,
                || async { Ok::<_, CacheError>(self.enrich_uncached(isbn).await) },
            )
            .await
    }

    /// Enrich several ISBNs of the same book and merge the results.
    ///
    /// Results are merged in input order. Every input ISBN that produced
    /// data ends up among the record's identifiers.
    pub async fn enrich_book_data_multi_isbn<I>(&self, isbns: I) -> Result<Option<BookRecord>, CacheError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut merged: Option<BookRecord> = None;
        let mut contributing = Vec::new();

        for isbn in isbns {
            let isbn = isbn.as_ref();
            let Some(record) = self.enrich_book_data(isbn).await? else {
                continue;
            };
            merged = Some(match merged {
                Some(acc) => merge(&acc, &record),
                None => record,
            });
            contributing.push(isbn.to_string());
        }

        let Some(mut record) = merged else {
            return Ok(None);
        };
        for isbn in contributing {
            record.add_identifier(Identifier::isbn(isbn));
        }
        Ok(Some(record))
    }

    /// Search every provider, returning at most `query.limit` distinct books.
    ///
    /// An ISBN criterion short-circuits to [`enrich_book_data`](Self::enrich_book_data).
    /// Otherwise providers are asked in order, each for the room left, and
    /// results are deduplicated by primary ISBN (records without one are dropped).
    pub async fn search_books(&self, query: &SearchQuery) -> Result<Vec<BookRecord>, CacheError> {
        if !query.isbn.is_empty() {
            return Ok(self.enrich_book_data(&query.isbn).await?.into_iter().collect());
        }

        let limit = query.limit;
        let mut results = Vec::new();
        if limit == 0 || !query.has_criteria() {
            return Ok(results);
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            let room = limit - results.len();
            if room == 0 {
                break;
            }

            let page = guarded(provider.name(), "search", provider.search(&query.with_limit(room)))
                .await
                .unwrap_or_default();
            tracing::debug!(provider = provider.name(), count = page.len(), "Search results");

            for record in page {
                if record.isbn.is_empty() || !seen.insert(record.isbn.clone()) {
                    continue;
                }
                results.push(record);
                if results.len() == limit {
                    break;
                }
            }
        }

        Ok(results)
    }

    /// Books on a bestseller list, enriched where possible.
    ///
    /// Entries without an ISBN are skipped. Entries no provider knows become
    /// minimal records built from the list itself. Every record carries the
    /// entry's rank and weeks on list.
    pub async fn get_bestsellers(&self, list_name: &str, limit: usize) -> Result<Vec<BookRecord>, CacheError> {
        let list = guarded("reviews", "get_bestsellers", self.reviews.get_bestsellers(list_name))
            .await
            .flatten();

        let Some(list) = list else {
            tracing::warn!(list_name, "Bestseller list unavailable");
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for entry in list.entries.iter().take(limit) {
            let Some(isbn) = entry.primary_isbn() else {
                tracing::debug!(list_name, rank = entry.rank, "Skipping bestseller without ISBN");
                continue;
            };
            let record = match self.enrich_book_data(isbn).await? {
                Some(record) => entry.annotate(record),
                None => entry.to_record(),
            };
            records.push(record);
        }

        Ok(records)
    }

    /// Names of the available bestseller lists.
    pub async fn list_names(&self) -> Vec<String> {
        guarded("reviews", "get_bestseller_lists", self.reviews.get_bestseller_lists())
            .await
            .unwrap_or_default()
    }

    /// Forget the cached enrichment result for an ISBN.
    pub async fn clear_cached(&self, isbn: &str) -> Result<(), CacheError> {
        self.cache
            .invalidate_call(ENRICH_BOOK_DATA, &json!({ "isbn": isbn }))
            .await
    }

    async fn enrich_uncached(&self, isbn: &str) -> Option<BookRecord> {
        let mut accumulated: Option<BookRecord> = None;

        for provider in &self.providers {
            match guarded(provider.name(), "fetch_book", provider.fetch_book(isbn)).await {
                Some(Some(record)) => {
                    tracing::info!(provider = provider.name(), isbn, "Found book data");
                    accumulated = Some(match accumulated {
                        Some(acc) => merge(&acc, &record),
                        None => record,
                    });
                }
                Some(None) => {
                    tracing::debug!(provider = provider.name(), isbn, "No book data");
                }
                None => {}
            }
        }

        let Some(mut record) = accumulated else {
            tracing::warn!(isbn, "No provider returned data");
            return None;
        };

        if let Some(Some(review)) =
            guarded("reviews", "get_book_review", self.reviews.get_book_review(isbn)).await
        {
            record.review = Some(review);
        }

        Some(record)
    }
}

/// Await a provider call, turning a panic into `None`.
async fn guarded<T, F>(provider: &str, operation: &str, call: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(provider, operation, "Provider call panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::domain::{BESTSELLERS_SOURCE, BestsellerEntry, BestsellerList, IdentifierKind};
    use crate::enrichment::traits::mocks::{MockBookProvider, MockReviewProvider};

    fn service(providers: &[Arc<MockBookProvider>], reviews: &Arc<MockReviewProvider>) -> EnrichmentService {
        let providers = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn BookDataProvider>)
            .collect();
        EnrichmentService::new(
            providers,
            reviews.clone(),
            ResponseCache::new(100),
            EnrichmentConfig::default(),
        )
    }

    fn book(isbn: &str, title: &str, source: &str) -> BookRecord {
        BookRecord {
            title: Some(title.to_string()),
            source: Some(source.to_string()),
            identifiers: vec![Identifier::isbn(isbn)],
            ..BookRecord::new(isbn)
        }
    }

    #[tokio::test]
    async fn test_empty_isbn_calls_nothing() {
        let google = Arc::new(MockBookProvider::empty("Google Books"));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google.clone()], &reviews);

        assert!(service.enrich_book_data("").await.unwrap().is_none());
        assert_eq!(google.fetch_count(), 0);
        assert_eq!(reviews.review_count(), 0);
    }

    #[tokio::test]
    async fn test_merges_providers_in_priority_order() {
        let isbn = "9780747532699";
        let google = Arc::new(MockBookProvider::empty("Google Books").with_book(BookRecord {
            description: None,
            categories: vec!["Fiction".to_string()],
            ..book(isbn, "Test Book", "Google Books")
        }));
        let open_library = Arc::new(MockBookProvider::empty("Open Library").with_book(BookRecord {
            description: Some("Open Library Description".to_string()),
            categories: vec!["Non-fiction".to_string()],
            ..book(isbn, "Other Title", "Open Library")
        }));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google, open_library], &reviews);

        let record = service.enrich_book_data(isbn).await.unwrap().unwrap();

        assert_eq!(record.title.as_deref(), Some("Test Book"));
        assert_eq!(record.description.as_deref(), Some("Open Library Description"));
        assert!(record.categories.contains(&"Fiction".to_string()));
        assert!(record.categories.contains(&"Non-fiction".to_string()));
        assert_eq!(record.source.as_deref(), Some("Google Books,Open Library"));
        assert_eq!(record.identifiers.len(), 1);
    }

    #[tokio::test]
    async fn test_no_data_skips_reviews() {
        let google = Arc::new(MockBookProvider::empty("Google Books"));
        let open_library = Arc::new(MockBookProvider::empty("Open Library"));
        let reviews = Arc::new(MockReviewProvider::empty().with_review("9999999999999", "never"));
        let service = service(&[google.clone(), open_library.clone()], &reviews);

        assert!(service.enrich_book_data("9999999999999").await.unwrap().is_none());
        assert_eq!(google.fetch_count(), 1);
        assert_eq!(open_library.fetch_count(), 1);
        assert_eq!(reviews.review_count(), 0);
    }

    #[tokio::test]
    async fn test_review_attached() {
        let isbn = "9780441013593";
        let google = Arc::new(MockBookProvider::empty("Google Books").with_book(book(isbn, "Dune", "Google Books")));
        let reviews = Arc::new(MockReviewProvider::empty().with_review(isbn, "A desert epic."));
        let service = service(&[google], &reviews);

        let record = service.enrich_book_data(isbn).await.unwrap().unwrap();
        assert_eq!(record.review.as_deref(), Some("A desert epic."));
    }

    #[tokio::test]
    async fn test_panicking_provider_does_not_abort() {
        let isbn = "9780441013593";
        let broken = Arc::new(MockBookProvider::panicking("Broken"));
        let open_library =
            Arc::new(MockBookProvider::empty("Open Library").with_book(book(isbn, "Dune", "Open Library")));
        let reviews = Arc::new(MockReviewProvider::panicking());
        let service = service(&[broken.clone(), open_library], &reviews);

        let record = service.enrich_book_data(isbn).await.unwrap().unwrap();

        assert_eq!(record.title.as_deref(), Some("Dune"));
        assert_eq!(record.review, None);
        assert_eq!(broken.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_result_is_cached() {
        let isbn = "9780441013593";
        let google = Arc::new(MockBookProvider::empty("Google Books").with_book(book(isbn, "Dune", "Google Books")));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google.clone()], &reviews);

        let first = service.enrich_book_data(isbn).await.unwrap();
        let second = service.enrich_book_data(isbn).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(google.fetch_count(), 1);

        service.clear_cached(isbn).await.unwrap();
        service.enrich_book_data(isbn).await.unwrap();
        assert_eq!(google.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_multi_isbn_records_every_contributing_isbn() {
        let google = Arc::new(MockBookProvider::empty("Google Books").with_book(BookRecord {
            identifiers: vec![Identifier::new(IdentifierKind::Isbn13, "9780747532699")],
            ..BookRecord::new("9780747532699")
        }));
        let open_library = Arc::new(MockBookProvider::empty("Open Library").with_book(BookRecord {
            title: Some("Harry Potter".to_string()),
            ..BookRecord::new("0747532699")
        }));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google, open_library], &reviews);

        let record = service
            .enrich_book_data_multi_isbn(["9780747532699", "0747532699"])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.isbn, "9780747532699");
        assert_eq!(record.title.as_deref(), Some("Harry Potter"));
        assert!(record.has_identifier(&IdentifierKind::Isbn13, "9780747532699"));
        assert!(record.has_identifier(&IdentifierKind::Isbn10, "0747532699"));
        assert_eq!(record.identifiers.len(), 2);
    }

    #[tokio::test]
    async fn test_multi_isbn_without_data() {
        let google = Arc::new(MockBookProvider::empty("Google Books"));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google], &reviews);

        let isbns = vec!["1".to_string(), "2".to_string()];
        assert!(service.enrich_book_data_multi_isbn(&isbns).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_isbn_skips_general_search() {
        let isbn = "9780441013593";
        let google = Arc::new(
            MockBookProvider::empty("Google Books")
                .with_book(book(isbn, "Dune", "Google Books"))
                .with_search_results(vec![book("1", "A", "Google Books"), book("2", "B", "Google Books")]),
        );
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google.clone()], &reviews);

        let query = SearchQuery {
            isbn: isbn.to_string(),
            ..SearchQuery::text("ignored")
        };
        let results = service.search_books(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title.as_deref(), Some("Dune"));
        assert_eq!(google.search_count(), 0);
    }

    #[tokio::test]
    async fn test_search_deduplicates_and_shares_room() {
        let google = Arc::new(MockBookProvider::empty("Google Books").with_search_results(vec![
            book("1", "A", "Google Books"),
            book("", "No ISBN", "Google Books"),
            book("2", "B", "Google Books"),
        ]));
        let open_library = Arc::new(MockBookProvider::empty("Open Library").with_search_results(vec![
            book("2", "B again", "Open Library"),
            book("3", "C", "Open Library"),
        ]));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google.clone(), open_library.clone()], &reviews);

        let results = service.search_books(&SearchQuery::text("x").with_limit(4)).await.unwrap();

        let isbns: Vec<&str> = results.iter().map(|r| r.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["1", "2", "3"]);
        assert_eq!(google.limits(), vec![4]);
        assert_eq!(open_library.limits(), vec![2]);
    }

    #[tokio::test]
    async fn test_search_stops_once_full() {
        let google = Arc::new(
            MockBookProvider::empty("Google Books")
                .with_search_results(vec![book("1", "A", "Google Books"), book("2", "B", "Google Books")]),
        );
        let open_library = Arc::new(MockBookProvider::empty("Open Library"));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google, open_library.clone()], &reviews);

        let results = service.search_books(&SearchQuery::text("x").with_limit(2)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(open_library.search_count(), 0);
    }

    #[tokio::test]
    async fn test_search_zero_limit_or_no_criteria() {
        let google = Arc::new(MockBookProvider::empty("Google Books"));
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[google.clone()], &reviews);

        assert!(service.search_books(&SearchQuery::text("x").with_limit(0)).await.unwrap().is_empty());
        assert!(service.search_books(&SearchQuery::default()).await.unwrap().is_empty());
        assert_eq!(google.search_count(), 0);
    }

    #[tokio::test]
    async fn test_bestsellers_enriched_or_synthesized() {
        let google = Arc::new(
            MockBookProvider::empty("Google Books").with_book(book("9780385550369", "The Watchman", "Google Books")),
        );
        let list = BestsellerList {
            name: "hardcover-fiction".to_string(),
            entries: vec![
                BestsellerEntry {
                    rank: 1,
                    weeks_on_list: 4,
                    isbn13: Some("9780385550369".to_string()),
                    ..Default::default()
                },
                BestsellerEntry {
                    rank: 2,
                    weeks_on_list: 1,
                    isbn13: Some("9780000000002".to_string()),
                    title: Some("UNKNOWN BOOK".to_string()),
                    author: Some("Someone".to_string()),
                    ..Default::default()
                },
                BestsellerEntry {
                    rank: 3,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let reviews = Arc::new(MockReviewProvider::empty().with_list(list));
        let service = service(&[google], &reviews);

        let records = service.get_bestsellers("hardcover-fiction", 2).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title.as_deref(), Some("The Watchman"));
        assert_eq!(records[0].rank, Some(1));
        assert_eq!(records[0].weeks_on_list, Some(4));
        assert_eq!(records[1].title.as_deref(), Some("UNKNOWN BOOK"));
        assert_eq!(records[1].authors, vec!["Someone"]);
        assert_eq!(records[1].source.as_deref(), Some(BESTSELLERS_SOURCE));
        assert_eq!(records[1].rank, Some(2));
    }

    #[tokio::test]
    async fn test_bestsellers_skip_entries_without_isbn() {
        let google = Arc::new(
            MockBookProvider::empty("Google Books").with_book(book("9780385550369", "The Watchman", "Google Books")),
        );
        let list = BestsellerList {
            name: "hardcover-fiction".to_string(),
            entries: vec![
                BestsellerEntry {
                    rank: 1,
                    title: Some("NO ISBN".to_string()),
                    ..Default::default()
                },
                BestsellerEntry {
                    rank: 2,
                    isbn13: Some("9780385550369".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let reviews = Arc::new(MockReviewProvider::empty().with_list(list));
        let service = service(&[google], &reviews);

        let records = service.get_bestsellers("hardcover-fiction", 5).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].isbn, "9780385550369");
        assert_eq!(records[0].rank, Some(2));
        assert!(records.iter().all(|r| !r.isbn.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_bestseller_list() {
        let reviews = Arc::new(MockReviewProvider::empty());
        let service = service(&[], &reviews);
        assert!(service.get_bestsellers("nope", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_names() {
        let reviews = Arc::new(MockReviewProvider::empty().with_list(BestsellerList {
            name: "hardcover-fiction".to_string(),
            ..Default::default()
        }));
        let service = service(&[], &reviews);
        assert_eq!(service.list_names().await, vec!["hardcover-fiction"]);
    }
}
