//! CLI command definitions and dispatch.
//!
//! This module provides the command-line interface for Book Enricher.
//! Each group of subcommands lives in its own submodule:
//! - `enrich`: Provider lookups (enrich, search, bestsellers, lists)
//! - `catalog`: Persisted books (show, list, stats)
//! - `settings`: Configuration file inspection

mod catalog;
mod enrich;
mod settings;

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::catalog::{CatalogRepository, CatalogService};
use crate::config::{self, Config, GOOGLE_BOOKS, OPEN_LIBRARY};
use crate::enrichment::nytimes::DEFAULT_LIST;
use crate::enrichment::{
    BookDataProvider, EnrichmentConfig, EnrichmentService, GoogleBooksClient, NyTimesClient,
    OpenLibraryClient, ResponseCache, SearchQuery, http,
};
use crate::error::{self, ResultExt};

pub use catalog::{cmd_list, cmd_show, cmd_stats};
pub use enrich::{cmd_bestsellers, cmd_enrich, cmd_lists, cmd_search};
pub use settings::cmd_config;

/// Book Enricher CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Google Books API key
    #[arg(long, global = true, env = "GOOGLE_BOOKS_API_KEY", hide_env_values = true)]
    pub google_books_api_key: Option<String>,

    /// New York Times API key (reviews and bestseller lists)
    #[arg(long, global = true, env = "NY_TIMES_API_KEY", hide_env_values = true)]
    pub ny_times_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Enrich a book from one or more of its ISBNs
    Enrich {
        /// ISBN-10 or ISBN-13 (several ISBNs are treated as one book)
        #[arg(required = true)]
        isbns: Vec<String>,
        /// Store the result in the catalog
        #[arg(long)]
        save: bool,
    },
    /// Search the providers
    Search {
        /// Free-text query
        query: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Several authors, comma separated
        #[arg(long, value_delimiter = ',')]
        authors: Vec<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        /// Look up a single ISBN instead of searching
        #[arg(long)]
        isbn: Option<String>,
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show an enriched bestseller list
    Bestsellers {
        /// Encoded list name (see `lists`)
        #[arg(default_value = DEFAULT_LIST)]
        list: String,
        /// Maximum number of entries
        #[arg(short, long, default_value = "15")]
        limit: usize,
    },
    /// List the available bestseller lists
    Lists,
    /// Show a catalog book by any of its ISBNs
    Show {
        isbn: String,
    },
    /// List catalog books, optionally filtered by title or author
    List {
        /// Substring of a title or author name
        #[arg(long)]
        search: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Show catalog statistics
    Stats,
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = load_config(cli);

    match &cli.command {
        Commands::Enrich { isbns, save } => cmd_enrich(&rt, &config, cli.db.as_deref(), isbns, *save),
        Commands::Search {
            query,
            title,
            author,
            authors,
            publisher,
            subject,
            isbn,
            limit,
        } => {
            let query = SearchQuery {
                query: query.clone().unwrap_or_default(),
                title: title.clone().unwrap_or_default(),
                author: author.clone().unwrap_or_default(),
                authors: authors.clone(),
                publisher: publisher.clone().unwrap_or_default(),
                subject: subject.clone().unwrap_or_default(),
                isbn: isbn.clone().unwrap_or_default(),
                limit: *limit,
            };
            cmd_search(&rt, &config, &query)
        }
        Commands::Bestsellers { list, limit } => cmd_bestsellers(&rt, &config, list, *limit),
        Commands::Lists => cmd_lists(&rt, &config),
        Commands::Show { isbn } => cmd_show(&rt, &config, cli.db.as_deref(), isbn),
        Commands::List { search, limit, offset } => {
            cmd_list(&rt, &config, cli.db.as_deref(), search.as_deref(), *limit, *offset)
        }
        Commands::Stats => cmd_stats(&rt, &config, cli.db.as_deref()),
        Commands::Config { init } => cmd_config(&config, cli.config.as_deref(), *init),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config file and apply key overrides from flags/environment.
fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    config.apply_key_overrides(cli.google_books_api_key.clone(), cli.ny_times_api_key.clone());
    config
}

/// Assemble the enrichment service from configuration.
///
/// Book data providers are registered in `providers.order`; unknown or
/// repeated names are skipped. All providers share one HTTP client and
/// one response cache.
pub(crate) fn build_enrichment(config: &Config) -> error::Result<EnrichmentService> {
    let http_client = http::build_client(config.http.timeout(), &config.http.user_agent)
        .with_context("building HTTP client")?;
    let cache = ResponseCache::new(config.cache.max_entries).with_prefix(config.cache.key_prefix.clone());
    let providers_config = &config.providers;

    let mut providers: Vec<Arc<dyn BookDataProvider>> = Vec::new();
    let mut seen = HashSet::new();
    for name in &providers_config.order {
        if !seen.insert(name.as_str()) {
            tracing::warn!(provider = %name, "Provider listed twice in providers.order, skipping");
            continue;
        }

        match name.as_str() {
            GOOGLE_BOOKS if providers_config.google_books.enabled => {
                let settings = &providers_config.google_books;
                let mut client = GoogleBooksClient::new(
                    http_client.clone(),
                    cache.clone(),
                    settings.cache_policy(&config.cache),
                )
                .with_api_key(settings.api_key.clone());
                if let Some(url) = &settings.base_url {
                    client = client.with_base_url(url.clone());
                }
                providers.push(Arc::new(client));
            }
            OPEN_LIBRARY if providers_config.open_library.enabled => {
                let settings = &providers_config.open_library;
                let mut client = OpenLibraryClient::new(
                    http_client.clone(),
                    cache.clone(),
                    settings.cache_policy(&config.cache),
                );
                if let Some(url) = &settings.base_url {
                    client = client.with_base_url(url.clone());
                }
                providers.push(Arc::new(client));
            }
            GOOGLE_BOOKS | OPEN_LIBRARY => {
                tracing::info!(provider = %name, "Provider disabled");
            }
            other => {
                tracing::warn!(provider = %other, "Unknown provider in providers.order, skipping");
            }
        }
    }

    if providers.is_empty() {
        tracing::warn!("No book data providers enabled, every lookup will come back empty");
    }

    let nytimes = &providers_config.nytimes;
    let api_key = if nytimes.enabled { nytimes.api_key.clone() } else { None };
    let mut reviews = NyTimesClient::new(
        http_client,
        api_key,
        cache.clone(),
        nytimes.cache_policy(&config.cache),
    );
    if let Some(url) = &nytimes.base_url {
        reviews = reviews.with_base_url(url.clone());
    }

    let enrichment_config = EnrichmentConfig {
        cache_policy: config.cache.enrichment_policy(),
    };
    Ok(EnrichmentService::new(
        providers,
        Arc::new(reviews),
        cache,
        enrichment_config,
    ))
}

/// Open (creating if needed) the catalog database.
pub(crate) async fn open_catalog(config: &Config, db_override: Option<&Path>) -> error::Result<CatalogService> {
    let path = db_override.or(config.catalog.database_path.as_deref());
    let db_url = crate::catalog::db_url(path);
    let pool = crate::catalog::init_db(&db_url)
        .await
        .with_context(format!("opening catalog {}", db_url))?;
    Ok(CatalogService::new(CatalogRepository::new(pool)))
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
