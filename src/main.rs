mod api;
mod cli;
mod config;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "courtedge")]
#[command(about = "NBA totals analytics and personal bet tracking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Overrides COURTEDGE_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize the database
    InitDb,
    /// Load the bundled season data set
    Seed {
        /// Wipe existing rows first
        #[arg(long)]
        reset: bool,
    },
    /// Query team statistics
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Project the game total for a matchup
    Project {
        team_a: String,
        team_b: String,
        #[arg(short, long)]
        line: Option<f64>,
    },
    /// Summarize tracked bets
    Bets,
    /// Write all tracked bets to a CSV file
    ExportBets {
        #[arg(short, long, default_value = "my-bets.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtedge=info,tower_http=info")),
        )
        .init();

    let mut config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            tracing::info!("Starting CourtEdge API server on port {}", config.port);
            api::serve(config).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            cli::init_db(&config).await?;
        }
        Some(Commands::Seed { reset }) => cli::seed(&config, reset).await?,
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            cli::query_team(&config, &name).await?;
        }
        Some(Commands::Project { team_a, team_b, line }) => {
            cli::project(&config, &team_a, &team_b, line).await?;
        }
        Some(Commands::Bets) => cli::bet_stats(&config).await?,
        Some(Commands::ExportBets { output }) => cli::export_bets(&config, &output).await?,
        None => {
            tracing::info!("Starting CourtEdge API server on port {}", config.port);
            api::serve(config).await?;
        }
    }

    Ok(())
}
