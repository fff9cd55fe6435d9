//! # autoprice
//!
//! Ingestion service for vehicle price observations.
//!
//! Scraper exports arrive as batches of JSON price records. Each batch is
//! tracked as a job; each record is normalized into a product (deduplicated
//! by brand, model line and trim) plus a dated price observation. Per-record
//! failures are reported back without stopping the batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ CLI upload  │──▶│   Pipeline   │──▶│  SQLite  │
//! │ HTTP upload │   │ dedup + date │   │  store   │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │ job/stats│       │ jobs/list│
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! autoprice init                          # create database
//! autoprice upload prices.json            # ingest a batch
//! autoprice job <batch-id>                # inspect the job
//! autoprice serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Ingestion error types |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`ingest`] | Batch ingestion pipeline |
//! | [`progress`] | Upload progress reporting |
//! | [`server`] | HTTP server |
//! | [`jobs`] | Job lookup |
//! | [`catalog`] | Brand and category listings |
//! | [`stats`] | Database overview |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
