//! Falconer CLI — operational entry point.
//!
//! Commands:
//! - `onboard` — Write a default config file
//! - `status`  — Show the effective engine configuration
//! - `doctor`  — Check tool-provider launch commands
//!
//! The engine itself is a library: callers wire a model provider and a
//! tool-provider transport and drive `falconer-agent` / `falconer-batch`
//! directly. This binary only covers setup and diagnostics.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use falconer_config::EngineConfig;
use falconer_mcp::bootstrap::resolve_command;

#[derive(Parser)]
#[command(
    name = "falconer",
    about = "Falconer — autonomous-agent execution engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Show the effective engine configuration
    Status,

    /// Check that configured tool providers are launchable
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => onboard(),
        Commands::Status => status(),
        Commands::Doctor => doctor(),
    }
}

fn onboard() -> anyhow::Result<()> {
    let config_dir = EngineConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating {}", config_dir.display()))?;
    std::fs::write(&config_path, EngineConfig::default_toml())
        .with_context(|| format!("writing {}", config_path.display()))?;

    info!(path = %config_path.display(), "wrote default config");
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}

fn status() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("loading configuration")?;

    println!("Falconer engine configuration");
    println!("  max_steps:               {}", config.max_steps);
    println!("  step_timeout:            {:?}", config.step_timeout());
    println!("  memory_limit:            {}", config.memory_limit);
    println!("  batch_size:              {}", config.batch.batch_size);
    println!(
        "  max_concurrent_batches:  {}",
        config.batch.max_concurrent_batches
    );
    println!("  tool providers:          {}", config.tool_providers.len());
    for provider in &config.tool_providers {
        println!("    - {} ({})", provider.id, provider.command);
    }
    Ok(())
}

fn doctor() -> anyhow::Result<()> {
    let config = EngineConfig::load().context("loading configuration")?;

    if config.tool_providers.is_empty() {
        println!("No tool providers configured.");
        return Ok(());
    }

    let mut healthy = true;
    for provider in &config.tool_providers {
        let resolved = resolve_command(&provider.command);
        let launchable = std::path::Path::new(&resolved).is_file();
        if launchable {
            println!("✓ {} — {}", provider.id, resolved);
        } else {
            println!("✗ {} — command not found: {}", provider.id, provider.command);
            healthy = false;
        }
    }

    if !healthy {
        anyhow::bail!("one or more tool providers are not launchable");
    }
    Ok(())
}
