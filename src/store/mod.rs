//! Storage abstraction for autoprice.
//!
//! The [`PriceStore`] trait is the keyed record store the ingestion pipeline
//! writes through: single-row lookup by composite key, single-row insert, and
//! single-row update by primary key, for products, price observations and
//! ingestion jobs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | [`SqliteStore`](crate::sqlite_store::SqliteStore) | Production backend |
//! | [`InMemoryStore`](memory::InMemoryStore) | Tests and embedding |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IngestionJob, ItemResult, NewProduct, PriceObservation, ProductKey};

/// Keyed record store used by the ingestion pipeline.
///
/// The store does not enforce uniqueness of [`ProductKey`]; callers that
/// need one product per key must look up before inserting.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_product`](PriceStore::find_product) | Product id for an exact natural key |
/// | [`insert_product`](PriceStore::insert_product) | Insert a product, returning its new id |
/// | [`insert_price`](PriceStore::insert_price) | Insert a price observation |
/// | [`create_job`](PriceStore::create_job) | Create a `processing` job; fails if the id exists |
/// | [`update_job_progress`](PriceStore::update_job_progress) | Persist the completed counter |
/// | [`complete_job`](PriceStore::complete_job) | Mark completed with final counts and results |
/// | [`get_job`](PriceStore::get_job) | Read a job back |
/// | [`list_brands`](PriceStore::list_brands) | Sorted distinct product brands |
/// | [`list_categories`](PriceStore::list_categories) | Sorted distinct product categories |
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Returns the id of a product whose brand, model and name equal `key`
    /// exactly, or `None`. When several rows match, the oldest wins.
    async fn find_product(&self, key: &ProductKey) -> Result<Option<String>>;

    async fn insert_product(&self, product: &NewProduct) -> Result<String>;

    /// Returns the new observation id.
    async fn insert_price(&self, observation: &PriceObservation) -> Result<String>;

    async fn create_job(&self, id: &str, total: u64) -> Result<()>;

    async fn update_job_progress(&self, id: &str, completed: u64) -> Result<()>;

    async fn complete_job(
        &self,
        id: &str,
        completed: u64,
        completed_at: &str,
        results: &[ItemResult],
    ) -> Result<()>;

    async fn get_job(&self, id: &str) -> Result<Option<IngestionJob>>;

    async fn list_brands(&self) -> Result<Vec<String>>;

    async fn list_categories(&self) -> Result<Vec<String>>;
}
