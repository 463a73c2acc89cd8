//! Trait definitions for external book data providers.
//!
//! The orchestrator only sees providers through these traits, which keeps
//! it independent of any concrete API and lets tests substitute mocks.
//!
//! # Example
//!
//! ```ignore
//! use book_enricher::enrichment::traits::BookDataProvider;
//!
//! async fn title_of(provider: &dyn BookDataProvider, isbn: &str) -> Option<String> {
//!     provider.fetch_book(isbn).await.and_then(|record| record.title)
//! }
//! ```

use async_trait::async_trait;

use super::domain::{BestsellerList, BookRecord, SearchQuery};
use super::google_books::GoogleBooksClient;
use super::nytimes::NyTimesClient;
use super::open_library::OpenLibraryClient;

/// A source of per-book metadata.
///
/// Implementations report failures as "no data" (`None` / empty list)
/// after logging them; they never abort the caller.
#[async_trait]
pub trait BookDataProvider: Send + Sync {
    /// Provider name used in logs and provenance trails.
    fn name(&self) -> &'static str;

    /// Look up one book by ISBN.
    async fn fetch_book(&self, isbn: &str) -> Option<BookRecord>;

    /// Search by criteria, returning at most `query.limit` records.
    async fn search(&self, query: &SearchQuery) -> Vec<BookRecord>;
}

/// A source of reviews and bestseller lists.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Summary of the first review for an ISBN.
    async fn get_book_review(&self, isbn: &str) -> Option<String>;

    /// Current edition of a named bestseller list.
    async fn get_bestsellers(&self, list_name: &str) -> Option<BestsellerList>;

    /// Names of every available bestseller list.
    async fn get_bestseller_lists(&self) -> Vec<String>;
}

// Implement traits for real clients

#[async_trait]
impl BookDataProvider for GoogleBooksClient {
    fn name(&self) -> &'static str {
        super::google_books::PROVIDER
    }

    async fn fetch_book(&self, isbn: &str) -> Option<BookRecord> {
        let info = self.get_book_data(isbn).await?;
        Some(self.to_enrichment_data(&info, isbn))
    }

    async fn search(&self, query: &SearchQuery) -> Vec<BookRecord> {
        self.search_books(query)
            .await
            .iter()
            .map(|info| self.to_enrichment_data(info, ""))
            .collect()
    }
}

#[async_trait]
impl BookDataProvider for OpenLibraryClient {
    fn name(&self) -> &'static str {
        super::open_library::PROVIDER
    }

    async fn fetch_book(&self, isbn: &str) -> Option<BookRecord> {
        let edition = self.get_book_data(isbn).await?;
        self.to_enrichment_data(&edition, isbn).await
    }

    async fn search(&self, query: &SearchQuery) -> Vec<BookRecord> {
        let mut records = Vec::new();
        for edition in self.search_books(query).await {
            if records.len() == query.limit {
                break;
            }
            if let Some(record) = self.to_enrichment_data(&edition, "").await {
                records.push(record);
            }
        }
        records
    }
}

#[async_trait]
impl ReviewProvider for NyTimesClient {
    async fn get_book_review(&self, isbn: &str) -> Option<String> {
        self.get_book_review(isbn).await
    }

    async fn get_bestsellers(&self, list_name: &str) -> Option<BestsellerList> {
        self.get_bestsellers(list_name).await
    }

    async fn get_bestseller_lists(&self) -> Vec<String> {
        self.get_bestseller_lists().await
    }
}
