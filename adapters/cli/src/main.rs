#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the dungeon engine from scripted sessions.

mod render;
mod script;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dungeon_broadcast::ChannelHub;
use dungeon_catalog::{DungeonRegistry, MapCatalog, MonsterRegistry};
use dungeon_service::{Catalogs, DungeonService, ServiceConfig, SystemClock};
use tokio::sync::Mutex;
use tracing::info;

/// Command-line arguments of the dungeon engine.
#[derive(Debug, Parser)]
#[command(name = "dungeon-crawl", version, about = "Replays scripted dungeon sessions")]
struct Cli {
    /// TOML file with service tunables.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Directory of Tiled JSON maps, keyed by file stem.
    #[arg(long, value_name = "DIR")]
    maps: Option<PathBuf>,
    /// TOML file listing `[[dungeon]]` entries.
    #[arg(long, value_name = "FILE")]
    dungeons: Option<PathBuf>,
    /// JSON array of monster templates.
    #[arg(long, value_name = "FILE")]
    monsters: Option<PathBuf>,
    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Lists the dungeons sessions can be opened for.
    Dungeons,
    /// Replays a JSON script of hero actions.
    Run {
        /// Script to replay.
        script: PathBuf,
    },
}

/// Entry point for the dungeon command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let catalogs = load_catalogs(&cli)?;

    match cli.command {
        Action::Dungeons => {
            for dungeon in catalogs.dungeons.list() {
                println!(
                    "{:<16} {:<24} map={} duration={}m",
                    dungeon.id.as_str(),
                    dungeon.name,
                    dungeon.map,
                    dungeon.duration_minutes
                );
            }
            Ok(())
        }
        Action::Run { script } => {
            let contents = fs::read_to_string(&script)
                .with_context(|| format!("failed to read script {}", script.display()))?;
            let steps = script::parse(&contents)
                .with_context(|| format!("failed to parse script {}", script.display()))?;
            info!(steps = steps.len(), script = %script.display(), "replaying script");

            let hub = Arc::new(ChannelHub::default());
            let service = Mutex::new(DungeonService::new(
                &config,
                catalogs,
                Arc::clone(&hub),
                SystemClock,
            ));
            script::Runner::new(&service, hub).run(steps).await
        }
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let Some(path) = &cli.config else {
        return Ok(ServiceConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ServiceConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn load_catalogs(cli: &Cli) -> Result<Catalogs> {
    let mut catalogs = Catalogs::builtin().context("failed to load bundled catalogs")?;
    if let Some(dir) = &cli.maps {
        let maps = MapCatalog::from_dir(dir)
            .with_context(|| format!("failed to load maps from {}", dir.display()))?;
        catalogs.maps = maps;
    }
    if let Some(path) = &cli.dungeons {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read dungeons {}", path.display()))?;
        catalogs.dungeons = DungeonRegistry::from_toml_str(&contents)
            .with_context(|| format!("failed to parse dungeons {}", path.display()))?;
    }
    if let Some(path) = &cli.monsters {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read monsters {}", path.display()))?;
        catalogs.monsters = MonsterRegistry::from_json_str(&contents)
            .with_context(|| format!("failed to parse monsters {}", path.display()))?;
    }
    Ok(catalogs)
}
