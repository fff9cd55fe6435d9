//! Batch ingestion pipeline.
//!
//! Turns an uploaded batch of raw price records into products and price
//! observations:
//!
//! 1. Create the job row (`processing`). Failure here aborts the batch.
//! 2. For each record, in order: resolve the product by natural key
//!    (lookup, insert when absent), then normalize the date and insert the
//!    price observation. Every record yields one result entry; no record
//!    failure stops the batch.
//! 3. After each record that got past product resolution, bump and persist
//!    the job's `completed` counter.
//! 4. Mark the job `completed` with the full results list.
//!
//! Records are processed strictly one after another. Product dedup is a
//! lookup followed by an insert with no lock, so it only holds within a
//! single batch: two batches racing on the same key can both insert.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::error::IngestError;
use crate::models::{BatchSummary, ItemResult, PriceObservation, RawPriceRecord, UploadRequest};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

/// Rejects batches that must not reach the store: an empty id, or more
/// records than `max_records`.
pub fn check_batch(batch_id: &str, len: usize, max_records: usize) -> Result<(), IngestError> {
    if batch_id.is_empty() {
        return Err(IngestError::InvalidBatch("batchId must not be empty".into()));
    }
    if len > max_records {
        return Err(IngestError::InvalidBatch(format!(
            "batch has {} records, limit is {}",
            len, max_records
        )));
    }
    Ok(())
}

/// Ingests one batch. Only job creation can fail the call; every per-record
/// fault ends up in the returned results.
pub async fn ingest_batch(
    store: &dyn PriceStore,
    batch_id: &str,
    records: Vec<Value>,
    reporter: &dyn IngestProgressReporter,
) -> Result<BatchSummary, IngestError> {
    let total = records.len() as u64;
    info!(batch_id, total, "Processing upload");

    if let Err(e) = store.create_job(batch_id, total).await {
        error!(batch_id, error = %e, "Error creating job");
        return Err(IngestError::JobCreation(e.to_string()));
    }
    reporter.report(IngestProgressEvent::Started {
        batch_id: batch_id.to_string(),
        total,
    });

    let mut progress = JobProgress::new(batch_id, total);

    for (index, item) in records.into_iter().enumerate() {
        let outcome = ingest_record(store, &item).await;

        if let Err(ref e) = outcome.result {
            warn!(batch_id, index, error = %e, "Error processing record");
        }
        let ok = outcome.result.is_ok();
        progress.record(item, outcome.result);

        if outcome.resolved {
            progress.mark_processed(store).await;
        }

        reporter.report(IngestProgressEvent::Item {
            batch_id: batch_id.to_string(),
            n: index as u64 + 1,
            total,
            ok,
        });
    }

    let summary = progress.finish(store).await;
    reporter.report(IngestProgressEvent::Finished {
        batch_id: batch_id.to_string(),
        processed: summary.processed,
        total: summary.total,
        failed: summary.failed_count() as u64,
    });

    Ok(summary)
}

/// Progress and results of the batch in flight.
///
/// Owns the `completed` counter and the ordered results; every change to the
/// counter is flushed to the job row straight away so pollers see live
/// progress.
#[derive(Debug)]
pub struct JobProgress {
    job_id: String,
    total: u64,
    completed: u64,
    results: Vec<ItemResult>,
}

impl JobProgress {
    pub fn new(job_id: &str, total: u64) -> Self {
        Self {
            job_id: job_id.to_string(),
            total,
            completed: 0,
            results: Vec::with_capacity(total as usize),
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Appends the result entry for `item`.
    pub fn record(&mut self, item: Value, result: Result<(), IngestError>) {
        let entry = match result {
            Ok(()) => ItemResult::ok(item),
            Err(e) => ItemResult::failed(item, e.to_string()),
        };
        self.results.push(entry);
    }

    /// Counts one more processed record and persists the counter. A failed
    /// write is logged; the next one carries the up-to-date value.
    pub async fn mark_processed(&mut self, store: &dyn PriceStore) {
        self.completed += 1;
        if let Err(e) = store.update_job_progress(&self.job_id, self.completed).await {
            warn!(batch_id = %self.job_id, completed = self.completed, error = %e, "Error updating job progress");
        }
    }

    /// Marks the job completed and builds the caller's summary.
    pub async fn finish(self, store: &dyn PriceStore) -> BatchSummary {
        let completed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = store
            .complete_job(&self.job_id, self.completed, &completed_at, &self.results)
            .await
        {
            error!(batch_id = %self.job_id, error = %e, "Error completing job");
        }

        let summary = BatchSummary {
            success: true,
            job_id: self.job_id,
            processed: self.completed,
            total: self.total,
            results: self.results,
        };
        info!(
            batch_id = %summary.job_id,
            processed = summary.processed,
            total = summary.total,
            failed = summary.failed_count(),
            "Job completed"
        );
        summary
    }
}

struct RecordOutcome {
    /// The product step finished, whatever happened to the price insert.
    resolved: bool,
    result: Result<(), IngestError>,
}

async fn ingest_record(store: &dyn PriceStore, item: &Value) -> RecordOutcome {
    let record: RawPriceRecord = match serde_json::from_value(item.clone()) {
        Ok(r) => r,
        Err(e) => {
            return RecordOutcome {
                resolved: false,
                result: Err(IngestError::InvalidRecord(e.to_string())),
            }
        }
    };

    let product_id = match resolve_product(store, &record).await {
        Ok(id) => id,
        Err(e) => {
            return RecordOutcome {
                resolved: false,
                result: Err(e),
            }
        }
    };

    RecordOutcome {
        resolved: true,
        result: insert_observation(store, &record, product_id).await,
    }
}

/// Existing product id for the record's natural key, or a newly inserted one.
async fn resolve_product(
    store: &dyn PriceStore,
    record: &RawPriceRecord,
) -> Result<String, IngestError> {
    let existing = store
        .find_product(&record.product_key())
        .await
        .map_err(|e| IngestError::ProductLookup(e.to_string()))?;

    match existing {
        Some(id) => Ok(id),
        None => store
            .insert_product(&record.new_product())
            .await
            .map_err(|e| IngestError::ProductInsert(e.to_string())),
    }
}

async fn insert_observation(
    store: &dyn PriceStore,
    record: &RawPriceRecord,
    product_id: String,
) -> Result<(), IngestError> {
    let observation = PriceObservation {
        product_id,
        store: record.store_label(),
        price: record.price,
        date: normalize_date(&record.scraped_at)?,
    };

    store
        .insert_price(&observation)
        .await
        .map_err(|e| IngestError::PriceInsert(e.to_string()))?;

    Ok(())
}

/// Parses a scraper date string into `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Values without an offset are taken as UTC.
pub fn normalize_date(raw: &str) -> Result<String, IngestError> {
    let s = raw.trim();

    let parsed: Option<DateTime<Utc>> = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            [
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d %H:%M",
            ]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        });

    parsed
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| IngestError::InvalidDate(raw.to_string()))
}

/// Reads an upload file: either a bare array of records or a full
/// `{"jsonData": [...], "batchId": "..."}` payload.
pub fn read_upload_file(path: &Path) -> Result<(Vec<Value>, Option<String>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read upload file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse upload file: {}", path.display()))?;

    match value {
        Value::Array(records) => Ok((records, None)),
        other => {
            let request: UploadRequest = serde_json::from_value(other)
                .with_context(|| "Upload file must be an array of records or a {jsonData, batchId} object")?;
            Ok((request.json_data, Some(request.batch_id)))
        }
    }
}

/// CLI entry point for `autoprice upload`.
///
/// The batch id is taken from `batch_id`, then from the file, and otherwise
/// generated.
pub async fn run_upload(
    config: &Config,
    path: &Path,
    batch_id: Option<String>,
    reporter: &dyn IngestProgressReporter,
) -> Result<BatchSummary> {
    let (records, file_batch_id) = read_upload_file(path)?;
    let batch_id = batch_id
        .or(file_batch_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    check_batch(&batch_id, records.len(), config.ingest.max_batch_records)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let outcome = ingest_batch(&store, &batch_id, records, reporter).await;
    pool.close().await;
    let summary = outcome?;

    println!("upload {}", summary.job_id);
    println!("  total records: {}", summary.total);
    println!("  processed: {}", summary.processed);
    println!("  failed: {}", summary.failed_count());
    for (i, entry) in summary.results.iter().enumerate() {
        if let Some(ref message) = entry.error {
            println!("  [{}] {}", i, message);
        }
    }
    println!("ok");

    Ok(summary)
}
