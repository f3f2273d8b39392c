//! agora CLI - operate the forum database
//!
//! - `migrate`: apply the schema (idempotent)
//! - `ping`: connect and run `SELECT 1`
//! - `config`: print the effective store configuration

use std::path::PathBuf;
use std::sync::Arc;

use agora_store::{Store, StoreConfig, TracingRevalidator};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "agora",
    author,
    version,
    about = "Admin tool for the agora forum database"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    /// PostgreSQL connection string
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Config file (default: ~/.agora/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create tables and indexes if they are missing
    Migrate,
    /// Check that the database is reachable
    Ping,
    /// Print the effective configuration as TOML
    Config,
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = &cli.database_url {
        config.database_url = Some(url.clone());
    }
    Ok(config)
}

/// Hide the password in a connection string.
fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

async fn run_migrate(config: StoreConfig) -> Result<()> {
    let store = Store::connect(config, Arc::new(TracingRevalidator))
        .await
        .context("Failed to connect to database")?;
    store.migrate().await.context("Migration failed")?;
    store.close().await;
    info!("Schema is up to date");
    Ok(())
}

async fn run_ping(config: StoreConfig) -> Result<()> {
    let store = Store::new(config, Arc::new(TracingRevalidator));
    store.ping().await.context("Database is not reachable")?;
    store.close().await;
    println!("ok");
    Ok(())
}

fn run_config(mut config: StoreConfig) -> Result<()> {
    config.database_url = config.database_url.as_deref().map(redact);
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    print!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Migrate => run_migrate(config).await?,
        Commands::Ping => run_ping(config).await?,
        Commands::Config => run_config(config)?,
    }

    Ok(())
}
