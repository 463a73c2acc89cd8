//! NYT Books API Data Transfer Objects
//!
//! DO NOT use these types outside the nytimes module - convert to domain types.

use serde::{Deserialize, Serialize};

/// Response of `GET /reviews.json?isbn=...`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub num_results: u32,
    #[serde(default)]
    pub results: Vec<Review>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Review {
    pub url: Option<String>,
    pub byline: Option<String>,
    pub book_title: Option<String>,
    pub book_author: Option<String>,
    pub summary: Option<String>,
}

/// Response of `GET /lists/current/{list}.json`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListResponse {
    pub results: Option<ListResults>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListResults {
    pub list_name: Option<String>,
    pub list_name_encoded: Option<String>,
    pub display_name: Option<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub books: Vec<ListBook>,
}

/// One ranked book
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListBook {
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub weeks_on_list: u32,
    pub primary_isbn13: Option<String>,
    pub primary_isbn10: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub book_image: Option<String>,
}

/// Response of `GET /lists/names.json`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListNamesResponse {
    #[serde(default)]
    pub results: Vec<ListName>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListName {
    pub list_name: Option<String>,
    pub display_name: Option<String>,
    /// URL-safe name, e.g. "hardcover-fiction"
    pub list_name_encoded: Option<String>,
    pub updated: Option<String>,
}
