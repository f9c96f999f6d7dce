//! Melodeon - personal music library server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melodeon::{
    api::{self, ApiState},
    config::{self, ServerConfig},
};

/// Personal music library server.
#[derive(Parser)]
#[command(name = "melodeon", about = "Personal music library server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind the API server.
        #[arg(long, default_value = "0.0.0.0:4000", env = "MELODEON_BIND")]
        bind: String,

        /// Directory for the database and uploaded assets.
        #[arg(long, env = "MELODEON_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Maximum accepted upload size in bytes.
        #[arg(long, env = "MELODEON_MAX_UPLOAD_BYTES")]
        max_upload_bytes: Option<usize>,
    },

    /// Show library status.
    Status {
        /// Melodeon API URL.
        #[arg(long, env = "MELODEON_API_URL", default_value = "http://localhost:4000")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "melodeon=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            data_dir,
            max_upload_bytes,
        } => {
            run_server(&bind, data_dir, max_upload_bytes).await?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }
    }

    Ok(())
}

/// Run the API server.
async fn run_server(
    bind: &str,
    data_dir: Option<PathBuf>,
    max_upload_bytes: Option<usize>,
) -> Result<()> {
    let data_dir = config::resolve_data_dir(data_dir.as_deref());

    let mut config = ServerConfig::new(data_dir);
    if let Some(bytes) = max_upload_bytes {
        config = config.with_max_upload_bytes(bytes);
    }

    tracing::info!(data_dir = %config.data_dir.display(), "Starting Melodeon server");

    let state = Arc::new(ApiState::new(config)?);
    api::serve(state, bind).await?;

    Ok(())
}

/// Show library status via the API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/status", api_url.trim_end_matches('/'));

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("Melodeon Status");
    println!("===============");
    println!("Status:    {}", status["status"]);
    println!("Songs:     {}", status["songs"]);
    println!("Playlists: {}", status["playlists"]);

    Ok(())
}
