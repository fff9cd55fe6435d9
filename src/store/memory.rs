//! In-memory [`PriceStore`] implementation for testing and embedding.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Mirrors the SQLite
//! schema's constraints: job ids are unique and prices must be positive.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    IngestionJob, ItemResult, JobStatus, NewProduct, PriceObservation, Product, ProductKey,
};

use super::PriceStore;

/// A price observation as stored, with its generated id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPrice {
    pub id: String,
    pub observation: PriceObservation,
}

/// In-memory store for tests and embedding.
pub struct InMemoryStore {
    products: RwLock<Vec<Product>>,
    prices: RwLock<Vec<StoredPrice>>,
    jobs: RwLock<HashMap<String, IngestionJob>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(Vec::new()),
            prices: RwLock::new(Vec::new()),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of all products in insertion order.
    pub fn products(&self) -> Vec<Product> {
        read(&self.products).map(|p| p.clone()).unwrap_or_default()
    }

    /// Snapshot of all price observations in insertion order.
    pub fn prices(&self) -> Vec<StoredPrice> {
        read(&self.prices).map(|p| p.clone()).unwrap_or_default()
    }

    pub fn job_count(&self) -> usize {
        read(&self.jobs).map(|j| j.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn find_product(&self, key: &ProductKey) -> Result<Option<String>> {
        let products = read(&self.products)?;
        Ok(products
            .iter()
            .find(|p| p.brand == key.brand && p.model == key.model && p.name == key.name)
            .map(|p| p.id.clone()))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        write(&self.products)?.push(Product {
            id: id.clone(),
            brand: product.key.brand.clone(),
            category: product.category.clone(),
            model: product.key.model.clone(),
            name: product.key.name.clone(),
        });
        Ok(id)
    }

    async fn insert_price(&self, observation: &PriceObservation) -> Result<String> {
        if observation.price.is_nan() || observation.price <= 0.0 {
            bail!("CHECK constraint failed: price > 0");
        }
        if !read(&self.products)?
            .iter()
            .any(|p| p.id == observation.product_id)
        {
            bail!("FOREIGN KEY constraint failed");
        }
        let id = Uuid::new_v4().to_string();
        write(&self.prices)?.push(StoredPrice {
            id: id.clone(),
            observation: observation.clone(),
        });
        Ok(id)
    }

    async fn create_job(&self, id: &str, total: u64) -> Result<()> {
        let mut jobs = write(&self.jobs)?;
        if jobs.contains_key(id) {
            bail!("UNIQUE constraint failed: scraping_jobs.id");
        }
        jobs.insert(
            id.to_string(),
            IngestionJob {
                id: id.to_string(),
                status: JobStatus::Processing,
                total,
                completed: 0,
                results: Vec::new(),
                created_at: chrono::Utc::now().to_rfc3339(),
                completed_at: None,
            },
        );
        Ok(())
    }

    async fn update_job_progress(&self, id: &str, completed: u64) -> Result<()> {
        let mut jobs = write(&self.jobs)?;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| anyhow!("job not found: {}", id))?;
        job.completed = completed;
        Ok(())
    }

    async fn complete_job(
        &self,
        id: &str,
        completed: u64,
        completed_at: &str,
        results: &[ItemResult],
    ) -> Result<()> {
        let mut jobs = write(&self.jobs)?;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| anyhow!("job not found: {}", id))?;
        job.status = JobStatus::Completed;
        job.completed = completed;
        job.completed_at = Some(completed_at.to_string());
        job.results = results.to_vec();
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<IngestionJob>> {
        Ok(read(&self.jobs)?.get(id).cloned())
    }

    async fn list_brands(&self) -> Result<Vec<String>> {
        let products = read(&self.products)?;
        Ok(sorted_distinct(products.iter().map(|p| &p.brand)))
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let products = read(&self.products)?;
        Ok(sorted_distinct(products.iter().map(|p| &p.category)))
    }
}
