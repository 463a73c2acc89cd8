//! Open Library API Data Transfer Objects
//!
//! The edition endpoint (`/isbn/{isbn}.json`) and the books API
//! (`/api/books?jscmd=data`) describe the same thing with different shapes,
//! e.g. publishers are plain strings in one and `{name}` objects in the
//! other. [`Edition`] accepts both.
//! DO NOT use these types outside the open_library module - convert to domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An edition record from either endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Edition {
    pub key: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
    #[serde(default)]
    pub publishers: Vec<Named>,
    /// Free-form, e.g. "June 1, 2001" or "2001"
    pub publish_date: Option<String>,
    pub number_of_pages: Option<u32>,
    pub description: Option<Description>,
    #[serde(default)]
    pub subjects: Vec<Named>,
    #[serde(default)]
    pub languages: Vec<KeyRef>,
    /// Cover image ids (edition endpoint)
    #[serde(default)]
    pub covers: Vec<i64>,
    /// Cover image URLs (books API)
    pub cover: Option<Cover>,
    #[serde(default)]
    pub isbn_10: Vec<String>,
    #[serde(default)]
    pub isbn_13: Vec<String>,
    /// Identifier lists keyed by kind, e.g. `isbn_13`, `goodreads` (books API)
    #[serde(default)]
    pub identifiers: BTreeMap<String, Vec<String>>,
}

/// Author reference: either resolved (`name`) or a key to look up (`/authors/OL1A`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthorRef {
    pub key: Option<String>,
    pub name: Option<String>,
    /// Some editions nest the key as `{"author": {"key": ...}}`
    pub author: Option<KeyRef>,
}

impl AuthorRef {
    pub fn author_key(&self) -> Option<&str> {
        self.key
            .as_deref()
            .or_else(|| self.author.as_ref().map(|a| a.key.as_str()))
            .filter(|k| !k.is_empty())
    }
}

/// A string or an object with a `name`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Named {
    Text(String),
    Object { name: String },
}

impl Named {
    pub fn name(&self) -> &str {
        match self {
            Self::Text(name) | Self::Object { name } => name,
        }
    }
}

/// A string or a typed text object `{"type": "/type/text", "value": "..."}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Description {
    Text(String),
    Typed { value: String },
}

impl Description {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(value) | Self::Typed { value } => value,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyRef {
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Cover {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

/// Response of `/search.json`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default, rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

/// One search hit (a work, with the ISBNs of its editions)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchDoc {
    pub key: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub isbn: Vec<String>,
    pub first_publish_year: Option<i32>,
}

/// Response of `/authors/{id}.json`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Author {
    pub name: Option<String>,
    pub personal_name: Option<String>,
}
