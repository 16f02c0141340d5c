//! Kombat CLI - unattended battle and hunting agent
//!
//! Usage:
//!   kombat run        Run the battle and hunting loops until Ctrl-C
//!   kombat profile    Show the account's combat profile
//!   kombat energy     Show energy and time to the next refill
//!   kombat hunting    Show the current hunting session
//!   kombat init       Write a default kombat.toml

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use kombat_api::{load_query, GameApi, HttpGameClient};
use kombat_core::config::CONFIG_FILE;
use kombat_core::format::format_hms;
use kombat_core::KombatConfig;
use kombat_scheduler::{time_until, Agent, CancellationToken};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kombat")]
#[command(author, version, about = "Unattended battle and hunting agent")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to ./kombat.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent until interrupted
    Run,

    /// Fetch and print the combat profile
    Profile,

    /// Fetch and print the energy pool
    Energy,

    /// Print the current hunting session
    Hunting,

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if let Commands::Init { path } = &cli.command {
        return cmd_init(path);
    }

    let config = load_config(cli.config.as_deref())?;
    let api = connect(&config)?;

    match cli.command {
        Commands::Run => cmd_run(api, config).await,
        Commands::Profile => cmd_profile(api.as_ref()).await,
        Commands::Energy => cmd_energy(api.as_ref()).await,
        Commands::Hunting => cmd_hunting(api.as_ref()).await,
        Commands::Init { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<KombatConfig> {
    match path {
        Some(path) => KombatConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => KombatConfig::load_or_default(Path::new("."))
            .with_context(|| format!("Failed to load {}", CONFIG_FILE)),
    }
}

fn connect(config: &KombatConfig) -> Result<Arc<dyn GameApi>> {
    let query = load_query(&config.api.query_file).context("No credentials available")?;
    let client =
        HttpGameClient::new(&config.api, &query).context("Failed to build game client")?;
    info!(base_url = client.base_url(), "Game client ready");
    Ok(Arc::new(client))
}

fn cmd_init(path: &Path) -> Result<()> {
    let target = path.join(CONFIG_FILE);
    if target.exists() {
        println!("{} already exists, leaving it unchanged", target.display());
        return Ok(());
    }

    let written = KombatConfig::write_default(path).context("Failed to write config")?;
    println!("Created {}", written.display());
    println!("\nNext steps:");
    println!("  1. Put your query token in query.txt (or set KOMBAT_QUERY)");
    println!("  2. Run 'kombat profile' to check the credentials");
    println!("  3. Run 'kombat run' to start the agent");
    Ok(())
}

async fn cmd_run(api: Arc<dyn GameApi>, config: KombatConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    info!(
        hunting = config.hunting.enabled,
        location = %config.hunting.location,
        "Starting agent"
    );
    let agent = Agent::new(api, config, cancel);
    let report = agent.run().await.context("Agent stopped on a fatal error")?;

    println!(
        "Stopped. Battle restarts: {}, hunting restarts: {}",
        report.battle_restarts, report.hunting_restarts
    );
    Ok(())
}

async fn cmd_profile(api: &dyn GameApi) -> Result<()> {
    let profile = api.profile().await.context("Failed to fetch profile")?;

    println!("Player: {} (rank {})", profile.username, profile.rank);
    println!(
        "  Attack: Lv.{} ({} PWR)",
        profile.attack_level, profile.attack_point
    );
    println!(
        "  Health: Lv.{} ({} HP)",
        profile.health_level, profile.health_point
    );
    println!("  Luck:   Lv.{}", profile.luck_level);
    println!(
        "  Rates:  evade {}%, critical {}%, reflect {}%, life steal {}%",
        profile.luck_evade_rate,
        profile.luck_critical_rate,
        profile.reflect_rate,
        profile.life_steal
    );
    match &profile.pet {
        Some(pet) => {
            println!("  Pet:    {} (active: {})", pet.kind, pet.active_skill);
            if !pet.skills.is_empty() {
                println!("          skills: {}", pet.skills.join(", "));
            }
        }
        None => println!("  Pet:    none"),
    }
    Ok(())
}

async fn cmd_energy(api: &dyn GameApi) -> Result<()> {
    let energy = api.energy().await.context("Failed to fetch energy")?;

    println!("Energy: {}", energy.current_energy);
    match energy.next_refill {
        Some(next) => println!(
            "Next refill: {} (in {})",
            next.format("%Y-%m-%d %H:%M:%S UTC"),
            format_hms(time_until(next, Utc::now()))
        ),
        None => println!("Next refill: unknown"),
    }
    Ok(())
}

async fn cmd_hunting(api: &dyn GameApi) -> Result<()> {
    let session = api
        .hunting_status()
        .await
        .context("Failed to fetch hunting status")?;

    let Some(session) = session else {
        println!("No hunting session");
        return Ok(());
    };

    println!("Hunting: {}", session.status);
    if let Some(location) = &session.location {
        println!("  Location: {}", location);
    }
    if let Some(start) = session.start_time {
        println!("  Started:  {}", start.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(end) = session.end_time {
        println!(
            "  Ends:     {} (in {})",
            end.format("%Y-%m-%d %H:%M:%S UTC"),
            format_hms(time_until(end, Utc::now()))
        );
    }
    Ok(())
}
