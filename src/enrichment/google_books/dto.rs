//! Google Books API Data Transfer Objects
//!
//! These types match what the `/volumes` endpoint returns.
//! DO NOT use these types outside the google_books module - convert to domain types.

use serde::{Deserialize, Serialize};

/// Response of `GET /volumes?q=...`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(default)]
    pub total_items: u32,
    /// Absent (not empty) when nothing matched
    #[serde(default)]
    pub items: Vec<Volume>,
}

/// One search hit
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: Option<String>,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

/// Bibliographic data of a volume
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    /// "2001", "2001-06" or "2001-06-01"
    pub published_date: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub industry_identifiers: Vec<IndustryIdentifier>,
    pub page_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,
    /// ISO 639-1 code
    pub language: Option<String>,
    pub image_links: Option<ImageLinks>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
}

/// ISBN or other identifier, e.g. `{"type": "ISBN_13", "identifier": "978..."}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndustryIdentifier {
    /// ISBN_10, ISBN_13, ISSN or OTHER
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
}
