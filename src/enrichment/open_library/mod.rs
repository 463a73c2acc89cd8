//! Open Library API integration (library catalog provider)
//!
//! Edition lookups by ISBN, catalog search, and author key resolution.
//!
//! API docs: https://openlibrary.org/developers/api

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_record;
pub use client::{DEFAULT_BASE_URL, OpenLibraryClient, PROVIDER};
