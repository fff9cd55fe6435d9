//! Job lookup by batch id.
//!
//! Used by the `autoprice job` CLI command; the server answers the same
//! question on `GET /jobs/{id}`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::models::IngestionJob;
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

/// Loads a job from the configured database.
pub async fn get_job(config: &Config, id: &str) -> Result<IngestionJob> {
    let pool = db::connect(config).await?;
    let job = SqliteStore::new(pool.clone()).get_job(id).await;
    pool.close().await;

    match job? {
        Some(job) => Ok(job),
        None => bail!("job not found: {}", id),
    }
}

/// CLI entry point: prints the job and any failed records. An unknown id is
/// an error, so the process exits non-zero.
pub async fn run_job(config: &Config, id: &str) -> Result<()> {
    let job = get_job(config, id).await?;

    println!("--- Job ---");
    println!("id:           {}", job.id);
    println!("status:       {}", job.status.as_str());
    println!("progress:     {} / {}", job.completed, job.total);
    println!("created_at:   {}", job.created_at);
    println!(
        "completed_at: {}",
        job.completed_at.as_deref().unwrap_or("(running)")
    );

    let failed: Vec<_> = job
        .results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.error.as_deref().map(|e| (i, e)))
        .collect();

    if !job.results.is_empty() {
        println!();
        println!(
            "--- Results ({} ok, {} failed) ---",
            job.results.len() - failed.len(),
            failed.len()
        );
        for (i, message) in failed {
            println!("[{}] {}", i, message);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest_batch;
    use crate::migrate;
    use crate::progress::NoProgress;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_config(tmp: &TempDir) -> Config {
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("autoprice.sqlite");
        config
    }

    #[tokio::test]
    async fn unknown_job_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = temp_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        let err = run_job(&config, "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "job not found: missing");
    }

    #[tokio::test]
    async fn known_job_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let config = temp_config(&tmp);
        migrate::run_migrations(&config).await.unwrap();

        let pool = db::connect(&config).await.unwrap();
        let record = json!({
            "Marca": "Acme",
            "Categoría": "Sedan",
            "Modelo Principal": "X1",
            "Modelo": "X1 Base",
            "Precio": 100.0,
            "Fecha Scraping": "2024-01-01"
        });
        ingest_batch(&SqliteStore::new(pool.clone()), "b1", vec![record], &NoProgress)
            .await
            .unwrap();
        pool.close().await;

        let job = get_job(&config, "b1").await.unwrap();
        assert_eq!(job.completed, 1);
        run_job(&config, "b1").await.unwrap();
    }
}
