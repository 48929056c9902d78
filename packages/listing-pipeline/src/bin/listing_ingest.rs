//! CLI for running the listing pipeline against Postgres.
//!
//! Every command prints JSON to stdout. A pipeline failure prints the
//! structured error body `{success: false, error, retryable}` and exits 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_pipeline::{
    ClaimRunner, EntityId, IngestRequest, Pipeline, PipelineConfig, PostgresStore,
};

#[derive(Parser)]
#[command(name = "listing-ingest")]
#[command(about = "Ingest vehicle listing pages into the listing store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and extract one listing
    Ingest {
        url: String,
        /// Persist the result
        #[arg(long)]
        save: bool,
        /// Known vehicle id to attach to when no VIN match exists
        #[arg(long)]
        entity_id: Option<EntityId>,
        /// Include the raw fetched content in the output
        #[arg(long)]
        include_raw: bool,
    },

    /// Ingest newline-separated URLs from a file, with pacing
    Batch {
        file: String,
        /// Extract only, do not persist
        #[arg(long)]
        dry_run: bool,
    },

    /// Mine repair claims from unprocessed descriptions
    Claims {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn read_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listing_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    let database_url = config.require_database_url()?.to_string();

    let store = Arc::new(
        PostgresStore::new(&database_url)
            .await
            .context("Failed to connect to database")?,
    );

    match cli.command {
        Commands::Ingest {
            url,
            save,
            entity_id,
            include_raw,
        } => {
            let pipeline = Pipeline::new(&config, store).context("Failed to build fetchers")?;
            let request = IngestRequest {
                url,
                save_to_db: save,
                entity_id,
                include_raw,
            };

            match pipeline
                .run_with_budget(&request, config.batch.invocation_budget)
                .await
            {
                Ok(response) => print_json(&response)?,
                Err(e) => {
                    print_json(&e.to_response())?;
                    std::process::exit(1);
                }
            }
        }
        Commands::Batch { file, dry_run } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            let urls = read_urls(&contents);
            info!(count = urls.len(), file = %file, "Starting batch");

            let pipeline = Pipeline::new(&config, store).context("Failed to build fetchers")?;
            let report = pipeline.run_batch(&urls, !dry_run).await;
            print_json(&report)?;
        }
        Commands::Claims { limit } => {
            let runner = ClaimRunner::new(store);
            let report = runner
                .run_pending(limit)
                .await
                .context("Claim extraction failed")?;
            print_json(&report)?;
        }
    }

    Ok(())
}
