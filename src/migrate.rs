use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // No UNIQUE on (brand, model, name): product dedup is done by the
    // ingest pipeline's lookup-then-insert.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            brand TEXT NOT NULL,
            category TEXT NOT NULL,
            model TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_data (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            store TEXT NOT NULL,
            price REAL NOT NULL CHECK (price > 0),
            date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (product_id) REFERENCES products(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scraping_jobs (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            total_products INTEGER NOT NULL,
            completed_products INTEGER NOT NULL DEFAULT 0,
            results_json TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_products_natural_key ON products(brand, model, name)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_price_data_product_id ON price_data(product_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_price_data_date ON price_data(date DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
