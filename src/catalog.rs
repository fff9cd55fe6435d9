//! Filter-option listings: distinct product brands and categories.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listing {
    Brands,
    Categories,
}

/// Prints one value per line, sorted.
pub async fn run_list(config: &Config, listing: Listing) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let values = match listing {
        Listing::Brands => store.list_brands().await,
        Listing::Categories => store.list_categories().await,
    };
    pool.close().await;

    for value in values? {
        println!("{}", value);
    }
    Ok(())
}
