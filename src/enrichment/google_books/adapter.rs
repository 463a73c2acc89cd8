//! Adapter layer: Convert Google Books DTOs to domain models

use super::dto;
use crate::enrichment::domain::{BookRecord, Identifier, IdentifierKind, preferred_isbn};

/// Source name stamped on records from this provider
const SOURCE: &str = "Google Books";

/// Convert a volume into a [`BookRecord`].
///
/// `fallback_isbn` (the ISBN the caller looked up) becomes the primary ISBN;
/// when it is empty the volume's own ISBN-13, then ISBN-10, is used.
pub fn to_record(info: &dto::VolumeInfo, fallback_isbn: &str) -> BookRecord {
    let identifiers: Vec<Identifier> = info
        .industry_identifiers
        .iter()
        .filter(|id| !id.identifier.is_empty())
        .map(|id| Identifier::new(IdentifierKind::parse(&id.kind), id.identifier.clone()))
        .collect();

    let isbn = if fallback_isbn.is_empty() {
        preferred_isbn(&identifiers).unwrap_or_default().to_string()
    } else {
        fallback_isbn.to_string()
    };

    let mut record = BookRecord {
        isbn,
        title: non_empty(&info.title),
        subtitle: non_empty(&info.subtitle),
        authors: info.authors.clone(),
        description: non_empty(&info.description),
        published_date: info.published_date.as_deref().and_then(year_of),
        publisher: non_empty(&info.publisher),
        page_count: info.page_count,
        language: non_empty(&info.language),
        categories: info.categories.clone(),
        thumbnail: info.image_links.as_ref().and_then(|l| non_empty(&l.thumbnail)),
        preview_link: non_empty(&info.preview_link),
        rating: info.average_rating,
        reviews_count: info.ratings_count,
        source: Some(SOURCE.to_string()),
        identifiers,
        ..Default::default()
    };

    if !record.isbn.is_empty() {
        let primary = Identifier::isbn(record.isbn.clone());
        if !record.has_identifier(&primary.kind, &primary.value) {
            record.add_identifier(primary);
        }
    }

    record
}

/// Google dates are "YYYY", "YYYY-MM" or "YYYY-MM-DD"; only the year is reliable.
fn year_of(date: &str) -> Option<String> {
    date.split('-')
        .next()
        .map(str::trim)
        .filter(|year| !year.is_empty())
        .map(String::from)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
