//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`CatalogError`], [`CacheError`], [`ConfigError`])
//!   for detailed handling
//! - Provider errors ([`ApiError`](crate::enrichment::ApiError)) never get this
//!   far; providers log them and report "no data"

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::enrichment::cache::CacheError;
use crate::isbn::IsbnError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog persistence error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Response cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid ISBN input
    #[error("Invalid ISBN: {0}")]
    Isbn(#[from] IsbnError),

    /// Requested book or list does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, CatalogError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Catalog(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, reqwest::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Http(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("9780747532699");
        assert!(err.to_string().contains("9780747532699"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::invalid_input("no search criteria").context("while searching");
        let msg = err.to_string();
        assert!(msg.contains("while searching"));
        assert!(msg.contains("no search criteria"));
    }

    #[test]
    fn test_isbn_error_converts() {
        let err: Error = crate::isbn::validate("123").unwrap_err().into();
        assert!(matches!(err, Error::Isbn(IsbnError::InvalidLength(3))));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::not_found("x"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }

    #[test]
    fn test_catalog_result_ext() {
        let result: std::result::Result<(), CatalogError> = Err(CatalogError::MissingIsbn);
        let err = result.with_context("storing book").unwrap_err();
        assert!(matches!(err, Error::WithContext { .. }));
        assert!(err.to_string().starts_with("storing book"));
    }
}
