#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line runner for the retail sync jobs.
//!
//! Runs a single job against the services configured in the environment
//! and prints its summary as JSON, or starts the API server.
//!
//! Uses `indicatif-log-bridge` (via [`retail_sync_cli_utils::init_logger`])
//! so that log lines and progress bars share the terminal cleanly.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use retail_sync::config::SyncConfig;
use retail_sync::job_registry::{JobKind, all_jobs};
use retail_sync_cli_utils::IndicatifProgress;

#[derive(Parser)]
#[command(name = "retail_sync", about = "Airtable, Algolia and geocoding sync jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the inventory table into the search index
    Index,
    /// Geocode retailers that are missing coordinates
    Geocode,
    /// Export the retailer map feed as `GeoJSON`
    Map {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the registered sync jobs
    Jobs,
    /// Start the API server (`BIND_ADDR`, `PORT`)
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = retail_sync_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Index => {
            let config = SyncConfig::from_env();
            let progress = IndicatifProgress::index_bar(&multi, "Syncing inventory");
            let start = Instant::now();

            let summary = retail_sync::sync_index(&config, &progress).await?;

            log::info!("Index sync finished in {:.1}s", start.elapsed().as_secs_f64());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Geocode => {
            let config = SyncConfig::from_env();
            let progress = IndicatifProgress::geocode_bar(&multi, "Geocoding retailers");
            let start = Instant::now();

            let summary = retail_sync::sync_geocode(&config, &progress).await?;

            log::info!("Geocode sync finished in {:.1}s", start.elapsed().as_secs_f64());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Map { output } => {
            let config = SyncConfig::from_env();
            let collection = retail_sync::sync_map(&config).await?;
            let json = serde_json::to_string_pretty(&collection)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!(
                        "Wrote {} features to {}",
                        collection.features.len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }
        Commands::Jobs => {
            println!("{:<12} {:<10} {:<32} NAME", "ID", "KIND", "TABLE VARIABLE");
            println!("{}", "-".repeat(80));
            for job in &all_jobs() {
                let kind = match job.kind {
                    JobKind::Index(_) => "index",
                    JobKind::Geocode(_) => "geocode",
                };
                println!("{:<12} {kind:<10} {:<32} {}", job.id, job.table_env, job.name);
            }
        }
        Commands::Serve => {
            let config = SyncConfig::from_env();
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(retail_sync_server::run_server(config))
            })
            .await??;
        }
    }

    Ok(())
}
