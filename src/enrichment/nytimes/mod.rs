//! New York Times Books API integration (reviews provider)
//!
//! Review summaries per ISBN and the weekly bestseller lists.
//! Every call needs an API key; without one the client answers "no data".
//!
//! API docs: https://developer.nytimes.com/docs/books-product/1/overview

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_bestseller_list;
pub use client::{DEFAULT_BASE_URL, DEFAULT_LIST, NyTimesClient, PROVIDER};
