//! Catalog service - persists enrichment results.
//!
//! An unseen book is created; a known book only has its empty fields
//! filled, so human-entered data is never clobbered. Alternate ISBNs are
//! appended and never duplicated.

use serde::Serialize;

use super::{CatalogError, CatalogRepository};
use crate::enrichment::domain::{BookRecord, Identifier};
use crate::enrichment::service::EnrichmentService;

/// Result of persisting one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    pub book_id: i64,
    /// `true` if the book was created, `false` if an existing one was updated
    pub created: bool,
    /// Identifiers newly attached during this call
    pub identifiers_added: usize,
}

/// Persists enrichment output into the catalog.
#[derive(Debug, Clone)]
pub struct CatalogService {
    repository: CatalogRepository,
}

impl CatalogService {
    pub fn new(repository: CatalogRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &CatalogRepository {
        &self.repository
    }

    /// Create or update the catalog entity for an enrichment record.
    pub async fn store_enrichment(&self, record: &BookRecord) -> Result<StoreOutcome, CatalogError> {
        if record.isbn.trim().is_empty() {
            return Err(CatalogError::MissingIsbn);
        }

        let existing = match self.repository.get_by_isbn(&record.isbn).await? {
            Some(book) => Some(book),
            None => self.find_by_identifiers(record).await?,
        };

        let Some(book) = existing else {
            let book_id = self.repository.create(record).await?;
            let identifiers_added = self.repository.identifiers(book_id).await?.len();
            return Ok(StoreOutcome {
                book_id,
                created: true,
                identifiers_added,
            });
        };

        self.repository.update_missing(book.id, record).await?;
        let identifiers: Vec<Identifier> = record
            .identifiers
            .iter()
            .cloned()
            .chain(std::iter::once(Identifier::isbn(record.isbn.clone())))
            .collect();
        let identifiers_added = self.create_additional_isbns(book.id, &identifiers).await?;
        tracing::info!(book_id = book.id, identifiers_added, "Updated catalog book");

        Ok(StoreOutcome {
            book_id: book.id,
            created: false,
            identifiers_added,
        })
    }

    /// Enrich a book from all of its ISBNs and store the result.
    ///
    /// Returns `None` when no provider knows any of the ISBNs.
    pub async fn enrich_and_store(
        &self,
        enrichment: &EnrichmentService,
        isbns: &[String],
    ) -> Result<Option<StoreOutcome>, CatalogError> {
        let Some(record) = enrichment.enrich_book_data_multi_isbn(isbns).await? else {
            tracing::warn!(?isbns, "No enrichment data to store");
            return Ok(None);
        };

        self.store_enrichment(&record).await.map(Some)
    }

    /// Attach ISBN-10 / ISBN-13 identifiers; other kinds are skipped.
    ///
    /// Returns how many were new.
    pub async fn create_additional_isbns(
        &self,
        book_id: i64,
        identifiers: &[Identifier],
    ) -> Result<usize, CatalogError> {
        let mut added = 0;
        for identifier in identifiers {
            if !identifier.kind.is_isbn() {
                tracing::debug!(kind = %identifier.kind, "Skipping non-ISBN identifier");
                continue;
            }
            if self.repository.add_identifier(book_id, identifier).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn find_by_identifiers(&self, record: &BookRecord) -> Result<Option<super::Book>, CatalogError> {
        for identifier in record.identifiers.iter().filter(|id| id.kind.is_isbn()) {
            if let Some(book) = self.repository.get_by_isbn(&identifier.value).await? {
                return Ok(Some(book));
            }
        }
        Ok(None)
    }
}
