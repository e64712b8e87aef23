//! Command-line interface for ToriBot.

mod commands;

pub use commands::*;

use crate::config::SearchOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ToriBot - finds good deals on tori.fi
/// Scrapes marketplace listings, scores them with an LLM and reports the best.
#[derive(Parser)]
#[command(name = "toribot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load instead of the default locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Search query (overrides TORI_SEARCH_QUERY)
    #[arg(long, short, global = true)]
    pub query: Option<String>,

    /// Product category id (overrides TORI_PRODUCT_CATEGORY)
    #[arg(long, global = true)]
    pub category: Option<String>,

    /// Location filter (overrides TORI_LOCATION)
    #[arg(long, global = true)]
    pub location: Option<String>,

    /// Newest listings to ingest and evaluate (overrides MAX_LISTINGS)
    #[arg(long, short = 'n', global = true)]
    pub max_listings: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    #[must_use]
    pub fn search_overrides(&self) -> SearchOverrides {
        SearchOverrides {
            query: self.query.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            max_listings: self.max_listings,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape, evaluate, then write the report and send alerts (default)
    Run,

    /// Scrape new listings without evaluating them
    #[command(alias = "s")]
    Scrape,

    /// Evaluate stored listings that have no evaluation yet
    #[command(alias = "e")]
    Evaluate,

    /// Write the HTML report from what is stored
    Report,

    /// List stored searches
    Searches,

    /// Show the newest stored listings for the search with their scores
    #[command(alias = "ls")]
    Listings {
        /// Number of listings to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Forget a listing's evaluation so the next run scores it again
    ClearEvaluation {
        /// Listing id
        id: String,
    },

    /// Send a test message to the configured Telegram chat
    NotifyTest,

    /// Run cycles on the configured schedule until interrupted
    #[command(alias = "d")]
    Daemon,

    /// Create a default config.toml in the current directory
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_search_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "toribot",
            "scrape",
            "--query",
            "macbook",
            "--max-listings",
            "5",
        ]);
        assert!(matches!(cli.command, Some(Commands::Scrape)));

        let overrides = cli.search_overrides();
        assert_eq!(overrides.query.as_deref(), Some("macbook"));
        assert_eq!(overrides.max_listings, Some(5));
        assert_eq!(overrides.category, None);
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::parse_from(["toribot", "--category", "3215"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.category.as_deref(), Some("3215"));
    }

    #[test]
    fn clear_evaluation_takes_an_id() {
        let cli = Cli::parse_from(["toribot", "clear-evaluation", "123456"]);
        match cli.command {
            Some(Commands::ClearEvaluation { id }) => assert_eq!(id, "123456"),
            _ => panic!("expected clear-evaluation"),
        }
    }
}
