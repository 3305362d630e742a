mod cluster;
mod replay;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pinmap")]
#[command(about = "Cluster map sites and replay viewport sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Cluster a sites file for one viewport and print the markers as JSON
    Cluster {
        /// YAML or JSON file with a top-level `sites` list
        #[arg(long)]
        sites: PathBuf,
        /// Viewport center latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Viewport center longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Latitude span in degrees (defaults to the configured span)
        #[arg(long)]
        span_lat: Option<f64>,
        /// Longitude span in degrees (defaults to the latitude span)
        #[arg(long)]
        span_lon: Option<f64>,
        /// Groups larger than this collapse into a cluster marker
        #[arg(long)]
        max_individual: Option<usize>,
        /// Derive cluster ids from their members
        #[arg(long)]
        stable_ids: bool,
    },
    /// Replay a gesture script through a map session, one JSON line per output
    Replay {
        /// YAML script with a top-level `steps` list
        #[arg(long)]
        script: PathBuf,
        /// Serve sites from this file instead of the HTTP provider
        #[arg(long, conflicts_with = "url")]
        sites: Option<PathBuf>,
        /// Site provider base URL (overrides `PINMAP_SITES_URL`)
        #[arg(long)]
        url: Option<String>,
        /// How long to wait for outputs after each step
        #[arg(long, default_value = "100")]
        settle_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = pinmap_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Cluster {
            sites,
            lat,
            lon,
            span_lat,
            span_lon,
            max_individual,
            stable_ids,
        }) => {
            let args = cluster::ClusterArgs {
                sites,
                center: lat.zip(lon),
                span_lat,
                span_lon,
                max_individual,
                stable_ids,
            };
            cluster::run_cluster(&config, &args)?;
        }
        Some(Commands::Replay {
            script,
            sites,
            url,
            settle_ms,
        }) => {
            let source = match (sites, url) {
                (Some(path), _) => replay::SourceChoice::File(path),
                (None, Some(url)) => replay::SourceChoice::Url(url),
                (None, None) => replay::SourceChoice::Configured,
            };
            replay::run_replay(&config, &script, source, settle_ms).await?;
        }
        None => {
            println!("pinmap: run `pinmap --help` for available commands");
        }
    }

    Ok(())
}
