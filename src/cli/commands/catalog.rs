//! Catalog commands.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::error::Error;

use super::{open_catalog, print_json};

/// Show a stored book by its primary or any alternate ISBN
pub fn cmd_show(rt: &Runtime, config: &Config, db_path: Option<&Path>, isbn: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let catalog = open_catalog(config, db_path).await?;
        match catalog.repository().get_by_isbn(isbn).await? {
            Some(book) => print_json(&book),
            None => Err(Error::not_found(format!("no catalog book with ISBN {}", isbn)).into()),
        }
    })
}

/// List stored books
pub fn cmd_list(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let catalog = open_catalog(config, db_path).await?;
        let repo = catalog.repository();
        let books = match search {
            Some(text) => repo.search(text, limit).await?,
            None => repo.list(limit, offset).await?,
        };
        print_json(&books)
    })
}

/// Show catalog statistics
pub fn cmd_stats(rt: &Runtime, config: &Config, db_path: Option<&Path>) -> anyhow::Result<()> {
    rt.block_on(async {
        let catalog = open_catalog(config, db_path).await?;
        let stats = catalog.repository().stats().await?;
        print_json(&stats)
    })
}
