//! Ingestion error types.
//!
//! The `Display` string of an [`IngestError`] is what callers see: it is
//! written verbatim into a failed result entry, or into the `error` field of
//! a top-level 400 response.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The job row could not be created. Fatal to the whole batch.
    #[error("{0}")]
    JobCreation(String),

    /// The record is not a valid price record (missing or mistyped field).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("product lookup failed: {0}")]
    ProductLookup(String),

    #[error("{0}")]
    ProductInsert(String),

    #[error("invalid time value: {0:?}")]
    InvalidDate(String),

    #[error("{0}")]
    PriceInsert(String),

    /// The batch as a whole is unacceptable (empty id, too many records).
    /// Raised before any job row is written.
    #[error("{0}")]
    InvalidBatch(String),
}
