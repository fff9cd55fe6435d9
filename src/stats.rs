//! Database statistics overview.
//!
//! A quick summary of what has been ingested: product and observation counts,
//! jobs by status, and a per-brand breakdown. Used by `autoprice stats` to
//! confirm that uploads landed.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

/// Per-brand breakdown of products and observations.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandStats {
    pub brand: String,
    pub product_count: i64,
    pub observation_count: i64,
    pub latest_observation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub products: i64,
    pub observations: i64,
    pub jobs_processing: i64,
    pub jobs_completed: i64,
    pub brands: Vec<BrandStats>,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<StoreStats> {
    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    let observations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_data")
        .fetch_one(pool)
        .await?;

    let jobs_processing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM scraping_jobs WHERE status = 'processing'")
            .fetch_one(pool)
            .await?;

    let jobs_completed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM scraping_jobs WHERE status = 'completed'")
            .fetch_one(pool)
            .await?;

    let brand_rows = sqlx::query(
        r#"
        SELECT
            p.brand,
            COUNT(DISTINCT p.id) AS product_count,
            COUNT(pd.id) AS observation_count,
            MAX(pd.date) AS latest_observation
        FROM products p
        LEFT JOIN price_data pd ON pd.product_id = p.id
        GROUP BY p.brand
        ORDER BY observation_count DESC, p.brand ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let brands = brand_rows
        .iter()
        .map(|row| BrandStats {
            brand: row.get("brand"),
            product_count: row.get("product_count"),
            observation_count: row.get("observation_count"),
            latest_observation: row.get("latest_observation"),
        })
        .collect();

    Ok(StoreStats {
        products,
        observations,
        jobs_processing,
        jobs_completed,
        brands,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect_stats(&pool).await;
    pool.close().await;
    let stats = stats?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("autoprice: Database Stats");
    println!("=========================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!("  Products:      {}", stats.products);
    println!("  Observations:  {}", stats.observations);
    println!(
        "  Jobs:          {} completed, {} processing",
        stats.jobs_completed, stats.jobs_processing
    );

    if !stats.brands.is_empty() {
        println!();
        println!("  By brand:");
        println!(
            "  {:<24} {:>8} {:>12}   {}",
            "BRAND", "PRODUCTS", "OBSERVATIONS", "LATEST"
        );
        println!("  {}", "-".repeat(72));

        for b in &stats.brands {
            println!(
                "  {:<24} {:>8} {:>12}   {}",
                b.brand,
                b.product_count,
                b.observation_count,
                b.latest_observation.as_deref().unwrap_or("never")
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest_batch;
    use crate::migrate::apply_schema;
    use crate::progress::NoProgress;
    use crate::sqlite_store::SqliteStore;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn stats_reflect_ingested_batch() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());

        let rec = |brand: &str, name: &str, date: &str| {
            json!({
                "Marca": brand,
                "Categoría": "SUV",
                "Modelo Principal": "M",
                "Modelo": name,
                "Precio": 100.0,
                "Fecha Scraping": date
            })
        };
        ingest_batch(
            &store,
            "b1",
            vec![
                rec("Acme", "A", "2024-01-01"),
                rec("Acme", "A", "2024-03-01"),
                rec("Zeta", "Z", "2024-02-01"),
            ],
            &NoProgress,
        )
        .await
        .unwrap();

        let stats = collect_stats(&pool).await.unwrap();
        assert_eq!(stats.products, 2);
        assert_eq!(stats.observations, 3);
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.jobs_processing, 0);
        assert_eq!(stats.brands[0].brand, "Acme");
        assert_eq!(stats.brands[0].observation_count, 2);
        assert_eq!(
            stats.brands[0].latest_observation.as_deref(),
            Some("2024-03-01T00:00:00.000Z")
        );
    }
}
