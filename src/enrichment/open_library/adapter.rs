//! Adapter layer: Convert Open Library DTOs to domain models
//!
//! Author keys are resolved by the client before conversion; this module
//! stays free of I/O.

use super::dto;
use crate::enrichment::domain::{BookRecord, Identifier, IdentifierKind, preferred_isbn};

/// Source name stamped on records from this provider
const SOURCE: &str = "Open Library";

const COVERS_URL: &str = "https://covers.openlibrary.org/b";
const PREVIEW_URL: &str = "https://openlibrary.org/isbn";

/// Convert an edition into a [`BookRecord`], or `None` if it has no title.
///
/// `authors` are the edition's author names, already resolved from keys.
pub fn to_record(edition: &dto::Edition, fallback_isbn: &str, authors: Vec<String>) -> Option<BookRecord> {
    let title = non_empty(edition.title.as_deref())?;
    let mut record = BookRecord {
        title: Some(title),
        subtitle: non_empty(edition.subtitle.as_deref()),
        authors,
        description: edition
            .description
            .as_ref()
            .and_then(|d| non_empty(Some(d.text()))),
        published_date: edition.publish_date.as_deref().and_then(year_of),
        publisher: edition
            .publishers
            .first()
            .and_then(|p| non_empty(Some(p.name()))),
        page_count: edition.number_of_pages.filter(|pages| *pages > 0),
        language: edition.languages.first().and_then(|l| language_code(&l.key)),
        categories: edition
            .subjects
            .iter()
            .map(|s| s.name().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        source: Some(SOURCE.to_string()),
        ..Default::default()
    };

    for identifier in collect_identifiers(edition) {
        record.add_identifier(identifier);
    }

    record.isbn = if fallback_isbn.is_empty() {
        preferred_isbn(&record.identifiers).unwrap_or_default().to_string()
    } else {
        fallback_isbn.to_string()
    };

    if !record.isbn.is_empty() {
        let primary = Identifier::isbn(record.isbn.clone());
        if !record.has_identifier(&primary.kind, &primary.value) {
            record.add_identifier(primary);
        }
        record.preview_link = Some(format!("{PREVIEW_URL}/{}", record.isbn));
    }

    record.thumbnail = thumbnail(edition, &record.isbn);
    Some(record)
}

/// ISBN identifiers from the books API `identifiers` map, then the edition's
/// top-level lists.
fn collect_identifiers(edition: &dto::Edition) -> Vec<Identifier> {
    let nested = [("isbn_13", IdentifierKind::Isbn13), ("isbn_10", IdentifierKind::Isbn10)]
        .into_iter()
        .flat_map(|(name, kind)| {
            edition
                .identifiers
                .get(name)
                .into_iter()
                .flatten()
                .map(move |value| Identifier::new(kind.clone(), value.clone()))
        });

    let top_level = edition
        .isbn_13
        .iter()
        .map(|v| Identifier::new(IdentifierKind::Isbn13, v.clone()))
        .chain(
            edition
                .isbn_10
                .iter()
                .map(|v| Identifier::new(IdentifierKind::Isbn10, v.clone())),
        );

    nested
        .chain(top_level)
        .filter(|id| !id.value.is_empty())
        .collect()
}

/// Cover URL: derived from the ISBN when the edition has a cover, else the
/// books API's medium cover, else the first cover id.
fn thumbnail(edition: &dto::Edition, isbn: &str) -> Option<String> {
    let cover_id = edition.covers.iter().copied().find(|id| *id > 0);
    let has_cover = cover_id.is_some() || edition.cover.is_some();

    if has_cover && !isbn.is_empty() {
        return Some(format!("{COVERS_URL}/isbn/{isbn}-M.jpg"));
    }

    edition
        .cover
        .as_ref()
        .and_then(|c| c.medium.clone())
        .or_else(|| cover_id.map(|id| format!("{COVERS_URL}/id/{id}-M.jpg")))
}

/// "/languages/eng" -> "eng"
fn language_code(key: &str) -> Option<String> {
    key.rsplit('/').next().and_then(|code| non_empty(Some(code)))
}

/// Reduce a free-form publish date to its year: "June 1, 2001" -> "2001".
fn year_of(date: &str) -> Option<String> {
    let last = date.rsplit(',').next().unwrap_or(date).trim();
    let chars: Vec<char> = last.chars().collect();
    let year: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    non_empty(Some(year.as_str()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
