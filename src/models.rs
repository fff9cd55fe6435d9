//! Core data models used throughout autoprice.
//!
//! These types represent the raw upload records, the normalized products and
//! price observations written to the store, and the job/result shapes
//! returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw price record as submitted in an upload.
///
/// Field names follow the scraper's JSON export. Unknown keys are kept in
/// `extra` so the record can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(rename = "Marca")]
    pub brand: String,
    #[serde(rename = "Categoría")]
    pub category: String,
    #[serde(rename = "Modelo Principal")]
    pub model_line: String,
    #[serde(rename = "Modelo")]
    pub trim: String,
    /// Carried through but not part of the product key.
    #[serde(rename = "Submodelo", default, skip_serializing_if = "Option::is_none")]
    pub sub_model: Option<String>,
    #[serde(rename = "Precio")]
    pub price: f64,
    #[serde(rename = "Fecha Scraping")]
    pub scraped_at: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawPriceRecord {
    pub fn product_key(&self) -> ProductKey {
        ProductKey {
            brand: self.brand.clone(),
            model: self.model_line.clone(),
            name: self.trim.clone(),
        }
    }

    pub fn new_product(&self) -> NewProduct {
        NewProduct {
            key: self.product_key(),
            category: self.category.clone(),
        }
    }

    /// Label of the store an observation is attributed to: `"<brand> Store"`.
    pub fn store_label(&self) -> String {
        format!("{} Store", self.brand)
    }
}

/// Natural key of a product. Compared exactly: case-sensitive, untrimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub brand: String,
    pub model: String,
    pub name: String,
}

/// Product attributes for an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub key: ProductKey,
    pub category: String,
}

/// A stored product row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub brand: String,
    pub category: String,
    pub model: String,
    pub name: String,
}

/// A price observation ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceObservation {
    pub product_id: String,
    pub store: String,
    pub price: f64,
    /// ISO-8601 UTC, millisecond precision.
    pub date: String,
}

/// Lifecycle state of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }
}

/// Persisted progress and results for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionJob {
    pub id: String,
    pub status: JobStatus,
    pub total: u64,
    pub completed: u64,
    /// Empty until the job is completed.
    pub results: Vec<ItemResult>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Outcome of one record: `{item, success: true}` or `{item, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub item: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    pub fn ok(item: Value) -> Self {
        Self {
            item,
            success: Some(true),
            error: None,
        }
    }

    pub fn failed(item: Value, message: impl Into<String>) -> Self {
        Self {
            item,
            success: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Body of `POST /upload-json`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "jsonData", alias = "data")]
    pub json_data: Vec<Value>,
    #[serde(rename = "batchId")]
    pub batch_id: String,
}

/// Returned after a batch has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub success: bool,
    #[serde(rename = "jobId")]
    pub job_id: String,
    /// Records that passed product resolution.
    pub processed: u64,
    pub total: u64,
    pub results: Vec<ItemResult>,
}

impl BatchSummary {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_record_reads_scraper_keys() {
        let value = json!({
            "Marca": "Acme",
            "Categoría": "Sedan",
            "Modelo Principal": "X1",
            "Modelo": "X1 Base",
            "Precio": 20000,
            "Fecha Scraping": "2024-01-01"
        });
        let rec: RawPriceRecord = serde_json::from_value(value).unwrap();
        assert_eq!(rec.brand, "Acme");
        assert_eq!(rec.model_line, "X1");
        assert_eq!(rec.trim, "X1 Base");
        assert_eq!(rec.sub_model, None);
        assert_eq!(rec.price, 20000.0);
        assert_eq!(rec.store_label(), "Acme Store");
        assert_eq!(
            rec.product_key(),
            ProductKey {
                brand: "Acme".into(),
                model: "X1".into(),
                name: "X1 Base".into(),
            }
        );
    }

    #[test]
    fn raw_record_keeps_unknown_keys() {
        let value = json!({
            "Marca": "Acme",
            "Categoría": "SUV",
            "Modelo Principal": "Z",
            "Modelo": "Z Sport",
            "Submodelo": "AWD",
            "Precio": 1.5,
            "Fecha Scraping": "2024-01-01",
            "URL": "https://example.test/z"
        });
        let rec: RawPriceRecord = serde_json::from_value(value).unwrap();
        assert_eq!(rec.sub_model.as_deref(), Some("AWD"));
        assert_eq!(rec.extra["URL"], "https://example.test/z");
    }

    #[test]
    fn item_result_shapes() {
        let ok = serde_json::to_value(ItemResult::ok(json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"item": {"a": 1}, "success": true}));

        let failed = serde_json::to_value(ItemResult::failed(json!(1), "boom")).unwrap();
        assert_eq!(failed, json!({"item": 1, "error": "boom"}));
    }

    #[test]
    fn upload_request_accepts_data_alias() {
        let req: UploadRequest =
            serde_json::from_value(json!({"data": [], "batchId": "b"})).unwrap();
        assert!(req.json_data.is_empty());
        assert_eq!(req.batch_id, "b");
    }

    #[test]
    fn summary_uses_camel_case_job_id() {
        let summary = BatchSummary {
            success: true,
            job_id: "b1".into(),
            processed: 0,
            total: 0,
            results: vec![],
        };
        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["jobId"], "b1");
    }
}
