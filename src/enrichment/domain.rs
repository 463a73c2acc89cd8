//! Internal domain models for book enrichment.
//!
//! These types are OUR types - they don't change when external APIs change.
//! All external API responses get converted into these types via adapters.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Source name used for records synthesized from a bestseller list entry.
pub const BESTSELLERS_SOURCE: &str = "Bestsellers list";

/// Kind of an alternate identifier.
///
/// Providers spell kinds differently (`ISBN_13` vs `ISBN-13`); parsing maps
/// every separator style onto one canonical kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IdentifierKind {
    Isbn10,
    Isbn13,
    /// Provider-specific kind, stored upper-case with `-` separators
    Other(String),
}

impl IdentifierKind {
    /// Parse a provider kind string into the canonical vocabulary.
    pub fn parse(raw: &str) -> Self {
        let canonical = raw.trim().to_uppercase().replace(['_', ' '], "-");
        match canonical.as_str() {
            "ISBN-10" | "ISBN10" => Self::Isbn10,
            "ISBN-13" | "ISBN13" => Self::Isbn13,
            _ => Self::Other(canonical),
        }
    }

    /// Infer the kind of an ISBN from its length (10 or 13 significant chars).
    pub fn infer(isbn: &str) -> Self {
        let len = isbn.chars().filter(|c| *c != '-' && *c != ' ').count();
        match len {
            10 => Self::Isbn10,
            13 => Self::Isbn13,
            _ => Self::Other("ISBN".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Isbn10 => "ISBN-10",
            Self::Isbn13 => "ISBN-13",
            Self::Other(kind) => kind,
        }
    }

    /// True for ISBN-10 and ISBN-13.
    pub fn is_isbn(&self) -> bool {
        matches!(self, Self::Isbn10 | Self::Isbn13)
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for IdentifierKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<IdentifierKind> for String {
    fn from(kind: IdentifierKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One of a book's known identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: IdentifierKind,
    #[serde(rename = "identifier")]
    pub value: String,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Build an identifier whose kind is inferred from the value's length.
    pub fn isbn(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            kind: IdentifierKind::infer(&value),
            value,
        }
    }
}

/// Book metadata aggregated from zero or more providers.
///
/// Every scalar is independently nullable. Collections have set semantics
/// for merging; their order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookRecord {
    /// Primary ISBN (ISBN-10 or ISBN-13, may be empty)
    pub isbn: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    /// Publication date, or just the year when that's all the source knows
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub thumbnail: Option<String>,
    pub preview_link: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<u32>,
    /// Review summary attached by the reviews provider
    pub review: Option<String>,
    /// Provenance trail, e.g. "Google Books,Open Library"
    pub source: Option<String>,
    pub identifiers: Vec<Identifier>,
    /// Bestseller rank, when the record came from a bestseller list
    pub rank: Option<u32>,
    pub weeks_on_list: Option<u32>,
}

impl BookRecord {
    /// Create an empty record for an ISBN.
    pub fn new(isbn: impl Into<String>) -> Self {
        Self {
            isbn: isbn.into(),
            ..Default::default()
        }
    }

    /// First identifier value of the given kind.
    pub fn isbn_of(&self, kind: &IdentifierKind) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| &id.kind == kind)
            .map(|id| id.value.as_str())
    }

    /// Whether the (kind, value) pair is already recorded.
    pub fn has_identifier(&self, kind: &IdentifierKind, value: &str) -> bool {
        self.identifiers
            .iter()
            .any(|id| &id.kind == kind && id.value == value)
    }

    /// Append an identifier unless the same (kind, value) pair is present.
    ///
    /// Returns `true` if the identifier was added.
    pub fn add_identifier(&mut self, identifier: Identifier) -> bool {
        if self.has_identifier(&identifier.kind, &identifier.value) {
            return false;
        }
        self.identifiers.push(identifier);
        true
    }
}

/// Pick the primary ISBN out of an identifier list, preferring ISBN-13.
pub fn preferred_isbn(identifiers: &[Identifier]) -> Option<&str> {
    let by_kind = |kind: IdentifierKind| {
        identifiers
            .iter()
            .find(|id| id.kind == kind && !id.value.is_empty())
            .map(|id| id.value.as_str())
    };
    by_kind(IdentifierKind::Isbn13).or_else(|| by_kind(IdentifierKind::Isbn10))
}

/// Combine two records describing the same book.
///
/// `primary` wins every scalar it has a non-empty value for; `other` only
/// fills gaps. Authors and categories become duplicate-free unions.
/// Identifiers keep `primary`'s list verbatim and append `other`'s unseen
/// (kind, value) pairs. Sources form a comma-joined provenance trail without
/// repeating a name.
pub fn merge(primary: &BookRecord, other: &BookRecord) -> BookRecord {
    let mut identifiers = primary.identifiers.clone();
    let mut seen: HashSet<(IdentifierKind, String)> = identifiers
        .iter()
        .map(|id| (id.kind.clone(), id.value.clone()))
        .collect();
    for id in &other.identifiers {
        if seen.insert((id.kind.clone(), id.value.clone())) {
            identifiers.push(id.clone());
        }
    }

    BookRecord {
        isbn: if primary.isbn.is_empty() {
            other.isbn.clone()
        } else {
            primary.isbn.clone()
        },
        title: prefer_text(&primary.title, &other.title),
        subtitle: prefer_text(&primary.subtitle, &other.subtitle),
        authors: union(&primary.authors, &other.authors),
        description: prefer_text(&primary.description, &other.description),
        published_date: prefer_text(&primary.published_date, &other.published_date),
        publisher: prefer_text(&primary.publisher, &other.publisher),
        page_count: prefer_number(primary.page_count, other.page_count),
        language: prefer_text(&primary.language, &other.language),
        categories: union(&primary.categories, &other.categories),
        thumbnail: prefer_text(&primary.thumbnail, &other.thumbnail),
        preview_link: prefer_text(&primary.preview_link, &other.preview_link),
        rating: prefer_number(primary.rating, other.rating),
        reviews_count: prefer_number(primary.reviews_count, other.reviews_count),
        review: prefer_text(&primary.review, &other.review),
        source: merge_sources(primary.source.as_deref(), other.source.as_deref()),
        identifiers,
        rank: prefer_number(primary.rank, other.rank),
        weeks_on_list: prefer_number(primary.weeks_on_list, other.weeks_on_list),
    }
}

fn prefer_text(primary: &Option<String>, other: &Option<String>) -> Option<String> {
    match primary {
        Some(value) if !value.is_empty() => primary.clone(),
        _ => other.clone(),
    }
}

/// Zero counts as empty, matching how providers report "unknown".
fn prefer_number<T: Copy + PartialEq + Default>(primary: Option<T>, other: Option<T>) -> Option<T> {
    match primary {
        Some(value) if value != T::default() => primary,
        _ => other,
    }
}

fn union(primary: &[String], other: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(primary.len() + other.len());
    for item in primary.iter().chain(other) {
        if seen.insert(item.as_str()) {
            merged.push(item.clone());
        }
    }
    merged
}

fn merge_sources(primary: Option<&str>, other: Option<&str>) -> Option<String> {
    match (primary, other) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            let mut trail = a.to_string();
            for name in b.split(',').map(str::trim) {
                if !name.is_empty() && !trail_contains(&trail, name) {
                    trail.push(',');
                    trail.push_str(name);
                }
            }
            Some(trail)
        }
        (Some(a), _) if !a.is_empty() => Some(a.to_string()),
        (_, Some(b)) => Some(b.to_string()),
        (a, None) => a.map(str::to_string),
    }
}

fn trail_contains(trail: &str, name: &str) -> bool {
    trail.split(',').any(|part| part.trim() == name)
}

/// Criteria for a cross-provider search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: String,
    pub title: String,
    /// Legacy single-author criterion, used when `authors` is empty
    pub author: String,
    pub authors: Vec<String>,
    pub publisher: String,
    pub subject: String,
    pub isbn: String,
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            title: String::new(),
            author: String::new(),
            authors: Vec::new(),
            publisher: String::new(),
            subject: String::new(),
            isbn: String::new(),
            limit: 10,
        }
    }
}

impl SearchQuery {
    /// Free-text search.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Authors to search for: the list if given, else the legacy single author.
    pub fn effective_authors(&self) -> Vec<String> {
        if !self.authors.is_empty() {
            return self
                .authors
                .iter()
                .filter(|a| !a.is_empty())
                .cloned()
                .collect();
        }
        if self.author.is_empty() {
            Vec::new()
        } else {
            vec![self.author.clone()]
        }
    }

    /// True if at least one criterion is set.
    pub fn has_criteria(&self) -> bool {
        !(self.query.is_empty()
            && self.title.is_empty()
            && self.effective_authors().is_empty()
            && self.publisher.is_empty()
            && self.subject.is_empty()
            && self.isbn.is_empty())
    }

    /// Same criteria with a different result cap.
    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }
}

/// A published bestseller list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestsellerList {
    pub name: String,
    pub display_name: Option<String>,
    pub published_date: Option<String>,
    pub entries: Vec<BestsellerEntry>,
}

/// One ranked book on a bestseller list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestsellerEntry {
    pub rank: u32,
    pub weeks_on_list: u32,
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub image: Option<String>,
}

impl BestsellerEntry {
    /// ISBN-13 if present, else ISBN-10.
    pub fn primary_isbn(&self) -> Option<&str> {
        [&self.isbn13, &self.isbn10]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|isbn| !isbn.is_empty())
    }

    /// Minimal record built from the list entry alone.
    pub fn to_record(&self) -> BookRecord {
        let mut record = BookRecord::new(self.primary_isbn().unwrap_or_default());
        record.title = self.title.clone();
        record.authors = self
            .author
            .iter()
            .filter(|a| !a.is_empty())
            .cloned()
            .collect();
        record.description = self.description.clone().filter(|d| !d.is_empty());
        record.publisher = self.publisher.clone();
        record.thumbnail = self.image.clone();
        record.source = Some(BESTSELLERS_SOURCE.to_string());
        for isbn in [&self.isbn13, &self.isbn10].into_iter().flatten() {
            if !isbn.is_empty() {
                record.add_identifier(Identifier::isbn(isbn.clone()));
            }
        }
        self.annotate(record)
    }

    /// Stamp rank and weeks-on-list onto a record.
    pub fn annotate(&self, mut record: BookRecord) -> BookRecord {
        record.rank = Some(self.rank);
        record.weeks_on_list = Some(self.weeks_on_list);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(isbn: &str, title: Option<&str>, source: &str) -> BookRecord {
        BookRecord {
            isbn: isbn.to_string(),
            title: title.map(String::from),
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_parsing_ignores_separator_style() {
        assert_eq!(IdentifierKind::parse("ISBN_13"), IdentifierKind::Isbn13);
        assert_eq!(IdentifierKind::parse("ISBN-13"), IdentifierKind::Isbn13);
        assert_eq!(IdentifierKind::parse("isbn_10"), IdentifierKind::Isbn10);
        assert_eq!(
            IdentifierKind::parse("OTHER_ID"),
            IdentifierKind::parse("other-id")
        );
        assert_eq!(IdentifierKind::parse("OTHER").as_str(), "OTHER");
    }

    #[test]
    fn test_kind_inference_from_length() {
        assert_eq!(IdentifierKind::infer("9780747532699"), IdentifierKind::Isbn13);
        assert_eq!(IdentifierKind::infer("0747532699"), IdentifierKind::Isbn10);
        assert_eq!(IdentifierKind::infer("0-7475-3269-9"), IdentifierKind::Isbn10);
        assert!(!IdentifierKind::infer("12345").is_isbn());
    }

    #[test]
    fn test_identifier_serializes_with_canonical_kind() {
        let id = Identifier::new(IdentifierKind::parse("ISBN_10"), "0747532699");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["type"], "ISBN-10");
        assert_eq!(json["identifier"], "0747532699");

        let parsed: Identifier =
            serde_json::from_str(r#"{"type":"ISBN_13","identifier":"9780747532699"}"#).unwrap();
        assert_eq!(parsed.kind, IdentifierKind::Isbn13);
    }

    #[test]
    fn test_merge_prefers_primary_scalars() {
        let mut primary = record("9780000000001", Some("Test Book"), "Google Books");
        primary.description = None;
        primary.categories = vec!["Fiction".to_string()];

        let mut other = record("9780000000001", Some("Other Title"), "Open Library");
        other.description = Some("Open Library Description".to_string());
        other.categories = vec!["Non-fiction".to_string()];

        let merged = merge(&primary, &other);

        assert_eq!(merged.title.as_deref(), Some("Test Book"));
        assert_eq!(
            merged.description.as_deref(),
            Some("Open Library Description")
        );
        assert!(merged.categories.contains(&"Fiction".to_string()));
        assert!(merged.categories.contains(&"Non-fiction".to_string()));
        assert_eq!(merged.source.as_deref(), Some("Google Books,Open Library"));
    }

    #[test]
    fn test_merge_treats_empty_string_and_zero_as_missing() {
        let mut primary = BookRecord::new("");
        primary.description = Some(String::new());
        primary.page_count = Some(0);
        primary.rating = Some(0.0);

        let mut other = BookRecord::new("0747532699");
        other.description = Some("Filled".to_string());
        other.page_count = Some(223);
        other.rating = Some(4.5);

        let merged = merge(&primary, &other);

        assert_eq!(merged.isbn, "0747532699");
        assert_eq!(merged.description.as_deref(), Some("Filled"));
        assert_eq!(merged.page_count, Some(223));
        assert_eq!(merged.rating, Some(4.5));
    }

    #[test]
    fn test_merge_appends_unseen_identifiers() {
        let mut primary = BookRecord::new("9780747532699");
        primary.add_identifier(Identifier::isbn("9780747532699"));

        let mut other = BookRecord::new("0747532699");
        other.add_identifier(Identifier::isbn("0747532699"));
        other.add_identifier(Identifier::isbn("9780747532699"));

        let merged = merge(&primary, &other);

        assert_eq!(merged.identifiers.len(), 2);
        assert_eq!(merged.identifiers[0].value, "9780747532699");
        assert_eq!(
            merged.isbn_of(&IdentifierKind::Isbn10),
            Some("0747532699")
        );
    }

    #[test]
    fn test_merge_source_trail_does_not_repeat() {
        let a = record("1", None, "Google Books,Open Library");
        let b = record("1", None, "Open Library");
        assert_eq!(
            merge(&a, &b).source.as_deref(),
            Some("Google Books,Open Library")
        );

        let none = BookRecord::new("1");
        assert_eq!(merge(&none, &b).source.as_deref(), Some("Open Library"));
        assert_eq!(merge(&a, &none).source, a.source);
    }

    #[test]
    fn test_preferred_isbn_prefers_isbn13() {
        let ids = vec![
            Identifier::isbn("0747532699"),
            Identifier::isbn("9780747532699"),
        ];
        assert_eq!(preferred_isbn(&ids), Some("9780747532699"));
        assert_eq!(preferred_isbn(&ids[..1]), Some("0747532699"));
        assert_eq!(preferred_isbn(&[]), None);
    }

    #[test]
    fn test_search_query_authors_fallback() {
        let mut query = SearchQuery {
            author: "Rowling".to_string(),
            ..Default::default()
        };
        assert_eq!(query.effective_authors(), vec!["Rowling".to_string()]);

        query.authors = vec!["Tolkien".to_string(), String::new()];
        assert_eq!(query.effective_authors(), vec!["Tolkien".to_string()]);
        assert!(query.has_criteria());
        assert!(!SearchQuery::default().has_criteria());
    }

    #[test]
    fn test_bestseller_entry_minimal_record() {
        let entry = BestsellerEntry {
            rank: 3,
            weeks_on_list: 12,
            isbn13: Some(String::new()),
            isbn10: Some("0747532699".to_string()),
            title: Some("A Book".to_string()),
            author: Some("An Author".to_string()),
            description: Some(String::new()),
            ..Default::default()
        };

        let record = entry.to_record();

        assert_eq!(record.isbn, "0747532699");
        assert_eq!(record.authors, vec!["An Author".to_string()]);
        assert_eq!(record.description, None);
        assert_eq!(record.source.as_deref(), Some(BESTSELLERS_SOURCE));
        assert_eq!(record.rank, Some(3));
        assert_eq!(record.weeks_on_list, Some(12));
        assert_eq!(record.identifiers, vec![Identifier::isbn("0747532699")]);
    }
}
