//! Adapter layer: Convert NYT DTOs to domain models

use super::dto;
use crate::enrichment::domain::{BestsellerEntry, BestsellerList};

/// Convert a list response into a [`BestsellerList`].
///
/// `requested` is used as the list name when the response omits it.
pub fn to_bestseller_list(results: dto::ListResults, requested: &str) -> BestsellerList {
    BestsellerList {
        name: results
            .list_name_encoded
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| requested.to_string()),
        display_name: results.display_name.or(results.list_name),
        published_date: results.published_date,
        entries: results.books.into_iter().map(to_entry).collect(),
    }
}

fn to_entry(book: dto::ListBook) -> BestsellerEntry {
    BestsellerEntry {
        rank: book.rank,
        weeks_on_list: book.weeks_on_list,
        isbn13: non_empty(book.primary_isbn13),
        isbn10: non_empty(book.primary_isbn10),
        title: non_empty(book.title),
        author: non_empty(book.author),
        description: non_empty(book.description),
        publisher: non_empty(book.publisher),
        image: non_empty(book.book_image),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
