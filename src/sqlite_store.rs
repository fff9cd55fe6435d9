//! SQLite-backed [`PriceStore`] implementation.
//!
//! Maps each [`PriceStore`] operation onto single-row statements against the
//! `products`, `price_data` and `scraping_jobs` tables created by
//! [`migrate`](crate::migrate).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    IngestionJob, ItemResult, JobStatus, NewProduct, PriceObservation, ProductKey,
};
use crate::store::PriceStore;

/// SQLite implementation of the [`PriceStore`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PriceStore for SqliteStore {
    async fn find_product(&self, key: &ProductKey) -> Result<Option<String>> {
        let id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM products
            WHERE brand = ? AND model = ? AND name = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .bind(&key.brand)
        .bind(&key.model)
        .bind(&key.name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO products (id, brand, category, model, name, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&product.key.brand)
        .bind(&product.category)
        .bind(&product.key.model)
        .bind(&product.key.name)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_price(&self, observation: &PriceObservation) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO price_data (id, product_id, store, price, date, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&observation.product_id)
        .bind(&observation.store)
        .bind(observation.price)
        .bind(&observation.date)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn create_job(&self, id: &str, total: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scraping_jobs (id, status, total_products, completed_products, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(id)
        .bind(JobStatus::Processing.as_str())
        .bind(total as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_job_progress(&self, id: &str, completed: u64) -> Result<()> {
        let result = sqlx::query("UPDATE scraping_jobs SET completed_products = ? WHERE id = ?")
            .bind(completed as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("job not found: {}", id));
        }
        Ok(())
    }

    async fn complete_job(
        &self,
        id: &str,
        completed: u64,
        completed_at: &str,
        results: &[ItemResult],
    ) -> Result<()> {
        let results_json =
            serde_json::to_string(results).context("Failed to serialize job results")?;

        let result = sqlx::query(
            r#"
            UPDATE scraping_jobs
            SET status = ?, completed_products = ?, completed_at = ?, results_json = ?
            WHERE id = ?
            "#,
        )
        .bind(JobStatus::Completed.as_str())
        .bind(completed as i64)
        .bind(completed_at)
        .bind(&results_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("job not found: {}", id));
        }
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<IngestionJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, status, total_products, completed_products, results_json,
                   created_at, completed_at
            FROM scraping_jobs WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let status: String = row.get("status");
        let status = JobStatus::parse(&status)
            .ok_or_else(|| anyhow!("job {} has unknown status: {}", id, status))?;

        let results_json: Option<String> = row.get("results_json");
        let results: Vec<ItemResult> = match results_json {
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("job {} has malformed results", id))?,
            None => Vec::new(),
        };

        let total: i64 = row.get("total_products");
        let completed: i64 = row.get("completed_products");

        Ok(Some(IngestionJob {
            id: row.get("id"),
            status,
            total: total.max(0) as u64,
            completed: completed.max(0) as u64,
            results,
            created_at: row.get("created_at"),
            completed_at: row.get("completed_at"),
        }))
    }

    async fn list_brands(&self) -> Result<Vec<String>> {
        let brands: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT brand FROM products ORDER BY brand")
                .fetch_all(&self.pool)
                .await?;
        Ok(brands)
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}
