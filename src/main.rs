use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use pubg_stats::api::{build_router, state::AppState};
use pubg_stats::config::AppConfig;
use pubg_stats::service::{PageRequest, StatsService};

#[derive(Parser)]
#[command(name = "pubg-stats")]
#[command(about = "PUBG player statistics: ranked summaries, match timelines and map overlays")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a player's overview with a page of recent matches
    Player {
        name: String,

        #[arg(long, default_value = "steam")]
        platform: String,

        /// Matches per page, -1 for all
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Print reconciled ranked stats for a player and season
    Season {
        /// Account id ("account.…")
        player_id: String,

        /// Season id; defaults to the current season
        #[arg(long)]
        season: Option<String>,

        #[arg(long, default_value = "steam")]
        platform: String,
    },

    /// Print the scoreboard and kill/death timeline of one match
    Match {
        match_id: String,

        /// Subject player name
        #[arg(long)]
        player: String,

        #[arg(long, default_value = "steam")]
        platform: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    let fmt_layer = if cli.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Starting pubg-stats v{}", env!("CARGO_PKG_VERSION"));

    let service = StatsService::from_config(&config).context("building API client")?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let app = build_router(AppState::new(service), &config.server.cors_origin);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Player {
            name,
            platform,
            limit,
            offset,
        } => {
            let overview = service
                .get_player_with_matches(&platform, &name, PageRequest::new(limit, offset))
                .await?;
            print_json(&overview)?;
        }
        Commands::Season {
            player_id,
            season,
            platform,
        } => {
            let season_id = match season {
                Some(id) => id,
                None => service
                    .get_seasons(&platform)
                    .await?
                    .into_iter()
                    .find(|s| s.is_current)
                    .map(|s| s.id)
                    .context("no current season; pass --season")?,
            };
            let stats = service
                .get_player_season_stats(&platform, &player_id, &season_id)
                .await?;
            print_json(&stats)?;
        }
        Commands::Match {
            match_id,
            player,
            platform,
        } => {
            let details = service
                .get_match_details(&platform, &player, &match_id)
                .await?;
            print_json(&details)?;
        }
    }

    Ok(())
}
