//! Google Books API integration (volume info provider)
//!
//! Looks up volumes by ISBN and runs field-qualified searches.
//!
//! API docs: https://developers.google.com/books/docs/v1/using

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_record;
pub use client::{DEFAULT_BASE_URL, GoogleBooksClient, PROVIDER};
