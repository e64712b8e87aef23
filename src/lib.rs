pub mod cli;
pub mod clients;
pub mod config;
pub mod cycle;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod services;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_search_overrides(cli.search_overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if matches!(cli.command, Some(Commands::Init)) {
        init_tracing("info");
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists, leaving it alone.");
        }
        return Ok(());
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            return Err(e);
        }
    };

    init_tracing(&config.general.log_level);
    info!(event = "startup", version = env!("CARGO_PKG_VERSION"), "ToriBot starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cli::cmd_run(&config).await,
        Commands::Scrape => cli::cmd_scrape(&config).await,
        Commands::Evaluate => cli::cmd_evaluate(&config).await,
        Commands::Report => cli::cmd_report(&config).await,
        Commands::Searches => cli::cmd_searches(&config).await,
        Commands::Listings { limit } => cli::cmd_listings(&config, limit).await,
        Commands::ClearEvaluation { id } => cli::cmd_clear_evaluation(&config, &id).await,
        Commands::NotifyTest => cli::cmd_notify_test(&config).await,
        Commands::Daemon => cli::cmd_daemon(&config).await,
        Commands::Init => Ok(()),
    }
}
