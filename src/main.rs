//! # autoprice CLI
//!
//! Initializes the database, ingests price batches, inspects jobs and runs
//! the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! autoprice --config ./config/autoprice.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `autoprice init` | Create the SQLite database and run schema migrations |
//! | `autoprice upload <file>` | Ingest a JSON batch of price records |
//! | `autoprice job <id>` | Show a job's status, progress and failures |
//! | `autoprice stats` | Summarize products, observations and jobs |
//! | `autoprice brands` | List distinct brands |
//! | `autoprice categories` | List distinct categories |
//! | `autoprice serve` | Start the HTTP server |

use autoprice::catalog::{self, Listing};
use autoprice::progress::ProgressMode;
use autoprice::{config, ingest, jobs, migrate, server, stats};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ingestion service for vehicle price observations.
#[derive(Parser)]
#[command(
    name = "autoprice",
    about = "autoprice: ingestion service for vehicle price observations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/autoprice.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the products, price_data and
    /// scraping_jobs tables. Safe to run repeatedly.
    Init,

    /// Ingest a JSON file of price records.
    ///
    /// The file is either an array of records or a
    /// `{"jsonData": [...], "batchId": "..."}` object.
    Upload {
        /// Path to the JSON file.
        path: PathBuf,

        /// Batch id; overrides the one in the file. Generated when absent.
        #[arg(long)]
        batch_id: Option<String>,

        /// Progress output on stderr. Defaults to `human` on a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show a job by batch id.
    Job {
        /// Batch id.
        id: String,
    },

    /// Summarize what is in the database.
    Stats,

    /// List distinct product brands.
    Brands,

    /// List distinct product categories.
    Categories,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg.log.filter);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload {
            path,
            batch_id,
            progress,
        } => {
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            ingest::run_upload(&cfg, &path, batch_id, reporter.as_ref()).await?;
        }
        Commands::Job { id } => {
            jobs::run_job(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Brands => {
            catalog::run_list(&cfg, Listing::Brands).await?;
        }
        Commands::Categories => {
            catalog::run_list(&cfg, Listing::Categories).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
