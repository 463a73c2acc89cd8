//! Book Enricher - fetches and merges book metadata from public providers.
//!
//! Books are looked up on Google Books and Open Library, merged into one
//! record, annotated with New York Times reviews and bestseller ranks, and
//! optionally stored in a local SQLite catalog.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod isbn;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("book_enricher=info".parse()?))
        .init();

    cli::run_command(&args)
}
