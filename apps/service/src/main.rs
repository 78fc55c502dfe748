mod alerting;
mod config;
mod database;
mod monitoring;
mod orchestrator;
mod pool;
mod validation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use config::Config;
use orchestrator::Orchestrator;
use pool::LibsqlManager;

/// Background endpoint monitor with e-mail alerting.
#[derive(Debug, Parser)]
#[command(name = "lookout", version, about)]
struct Cli {
    /// Path of the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration file.
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let cli = Cli::parse();
    let mut config =
        Config::from_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    info!("opening database at {}", config.database.path.display());
    let database = libsql::Builder::new_local(&config.database.path).build().await?;
    let pool = deadpool::managed::Pool::builder(LibsqlManager::new(database))
        .build()
        .context("failed to build connection pool")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down after the current tick");
            let _ = shutdown_tx.send(true);
        }
    });

    Orchestrator::start(config, pool, shutdown_rx).await
}
