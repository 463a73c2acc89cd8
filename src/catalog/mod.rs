//! Catalog persistence for enriched books.
//!
//! Uses SQLx with SQLite for embedded storage. A book row owns its
//! alternate identifiers (cascade-deleted with it) and links to shared
//! author rows.
//!
//! # Example
//!
//! ```ignore
//! use book_enricher::catalog::{init_db, CatalogRepository, CatalogService};
//!
//! let pool = init_db("sqlite:books.db").await?;
//! let catalog = CatalogService::new(CatalogRepository::new(pool));
//! let outcome = catalog.store_enrichment(&record).await?;
//! ```

mod repository;
mod service;

pub use repository::CatalogRepository;
pub use service::{CatalogService, StoreOutcome};

use serde::Serialize;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::enrichment::cache::CacheError;
use crate::enrichment::domain::Identifier;
use crate::isbn::IsbnError;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "book_enricher.db";

/// Errors raised by the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid ISBN {isbn}: {source}")]
    InvalidIsbn {
        isbn: String,
        #[source]
        source: IsbnError,
    },

    #[error("Failed to encode or decode categories: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record has no ISBN")]
    MissingIsbn,

    #[error("Enrichment cache failure: {0}")]
    Cache(#[from] CacheError),
}

/// A persisted book with its authors and identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<i64>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub thumbnail: Option<String>,
    pub preview_link: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<i64>,
    pub review: Option<String>,
    pub source: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregate numbers over the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_books: i64,
    /// (year, count), most recent year first
    pub books_by_year: Vec<(String, i64)>,
    /// (author, count), most prolific first
    pub top_authors: Vec<(String, i64)>,
}

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist.
pub async fn init_db(db_url: &str) -> Result<SqlitePool, CatalogError> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
