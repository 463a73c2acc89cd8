//! Book enrichment module - fetches and merges metadata from external providers.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - `BookRecord` and the merge rule
//! - **API DTOs** (`google_books/dto.rs`, `open_library/dto.rs`, `nytimes/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for external APIs, each call behind the cache
//! - **Cache** (`cache.rs`) - Response cache keyed by call identity + argument digest
//! - **Service** - Walks the providers in priority order and merges their answers
//!
//! # Usage
//!
//! ```ignore
//! use book_enricher::enrichment::{EnrichmentService, EnrichmentConfig, ResponseCache};
//!
//! let service = EnrichmentService::new(providers, reviews, ResponseCache::default(), EnrichmentConfig::default());
//!
//! if let Some(book) = service.enrich_book_data("9780441013593").await? {
//!     println!("{:?} by {:?}", book.title, book.authors);
//! }
//! ```

pub mod cache;
pub mod domain;
pub mod error;
pub mod google_books;
pub mod http;
pub mod nytimes;
pub mod open_library;
pub mod service;
pub mod traits;

pub use cache::{CacheError, CachePolicy, ResponseCache};
pub use domain::{BestsellerEntry, BestsellerList, BookRecord, Identifier, IdentifierKind, SearchQuery, merge};
pub use error::ApiError;
pub use google_books::GoogleBooksClient;
pub use nytimes::NyTimesClient;
pub use open_library::OpenLibraryClient;
pub use service::{EnrichmentConfig, EnrichmentService};
pub use traits::{BookDataProvider, ReviewProvider};
