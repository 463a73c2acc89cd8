//! Provider lookup commands: enrichment, search and bestseller lists.

use clap::{CommandFactory, error::ErrorKind};
use serde::Serialize;
use std::path::Path;
use tokio::runtime::Runtime;

use crate::catalog::StoreOutcome;
use crate::config::Config;
use crate::enrichment::{BookRecord, SearchQuery};
use crate::error::Error;
use crate::isbn;

use super::{Cli, build_enrichment, open_catalog, print_json};

/// Output of `enrich --save`
#[derive(Serialize)]
struct SavedBook<'a> {
    book: &'a BookRecord,
    stored: StoreOutcome,
}

/// Enrich one book from one or more ISBNs
pub fn cmd_enrich(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    isbns: &[String],
    save: bool,
) -> anyhow::Result<()> {
    let isbns = isbns
        .iter()
        .map(|raw| isbn::validate(raw).map_err(|e| Error::from(e).context(format!("argument {:?}", raw))))
        .collect::<Result<Vec<_>, _>>()?;

    rt.block_on(async {
        let service = build_enrichment(config)?;
        let record = match isbns.as_slice() {
            [single] => service.enrich_book_data(single).await?,
            _ => service.enrich_book_data_multi_isbn(&isbns).await?,
        };

        let Some(record) = record else {
            return Err(Error::not_found(format!("no provider has data for {}", isbns.join(", "))).into());
        };

        if !save {
            return print_json(&record);
        }

        let catalog = open_catalog(config, db_path).await?;
        let stored = catalog.store_enrichment(&record).await?;
        tracing::info!(book_id = stored.book_id, created = stored.created, "Stored enrichment result");
        print_json(&SavedBook {
            book: &record,
            stored,
        })
    })
}

/// Search all providers
pub fn cmd_search(rt: &Runtime, config: &Config, query: &SearchQuery) -> anyhow::Result<()> {
    if !query.has_criteria() {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "give a query or at least one of --title, --author, --authors, --publisher, --subject, --isbn",
            )
            .exit();
    }

    rt.block_on(async {
        let service = build_enrichment(config)?;
        let results = service.search_books(query).await?;
        tracing::info!(count = results.len(), "Search complete");
        print_json(&results)
    })
}

/// Show a bestseller list, each entry enriched where possible
pub fn cmd_bestsellers(rt: &Runtime, config: &Config, list: &str, limit: usize) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = build_enrichment(config)?;
        let books = service.get_bestsellers(list, limit).await?;
        if books.is_empty() && limit > 0 {
            return Err(Error::not_found(format!("bestseller list {:?}", list)).into());
        }
        print_json(&books)
    })
}

/// List the bestseller list names the reviews provider knows
pub fn cmd_lists(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = build_enrichment(config)?;
        let names = service.list_names().await;
        if names.is_empty() {
            eprintln!("No bestseller lists available (is NY_TIMES_API_KEY set?)");
        }
        print_json(&names)
    })
}
