//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::{FeedType, USGS_BASE_URL};
use crate::list::SortKey;
use crate::output::Format;

/// Live earthquake dashboard for your terminal.
#[derive(Parser, Debug)]
#[command(name = "quaketui")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run (defaults to `dashboard`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Write logs to this file (the dashboard otherwise discards them)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive dashboard (refreshes every 5 minutes)
    Dashboard(DashboardArgs),

    /// Print current alerts and minor earthquakes once and exit
    Tail(TailArgs),
}

/// Where to fetch from.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Feed type to fetch
    #[arg(long, default_value = "2.5_day", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// USGS service root
    #[arg(long, default_value = USGS_BASE_URL)]
    pub base_url: String,
}

impl Default for FeedArgs {
    fn default() -> Self {
        Self {
            feed: FeedType::default(),
            base_url: USGS_BASE_URL.to_string(),
        }
    }
}

/// Arguments for the `dashboard` command.
#[derive(Args, Debug, Clone, Default)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub feed: FeedArgs,
}

/// Arguments for the `tail` command.
#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    /// Sort column for the minor-event list
    #[arg(long, default_value = "time", value_parser = parse_sort_key)]
    pub sort: SortKey,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a sort column from string.
fn parse_sort_key(s: &str) -> Result<SortKey, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_dashboard() {
        let cli = Cli::try_parse_from(["quaketui"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.log_file.is_none());
        assert_eq!(DashboardArgs::default().feed.feed, FeedType::Mag25Day);
    }

    #[test]
    fn test_tail_args() {
        let cli = Cli::try_parse_from([
            "quaketui", "--quiet", "tail", "--feed", "all_hour", "-f", "ndjson", "--sort", "mag", "--asc",
        ])
        .unwrap();
        assert!(cli.quiet);
        let Some(Command::Tail(args)) = cli.command else {
            panic!("expected tail");
        };
        assert_eq!(args.feed.feed, FeedType::AllHour);
        assert_eq!(args.feed.base_url, USGS_BASE_URL);
        assert_eq!(args.format, Format::Ndjson);
        assert_eq!(args.sort, SortKey::Magnitude);
        assert!(args.asc);
    }

    #[test]
    fn test_rejects_unknown_feed() {
        assert!(Cli::try_parse_from(["quaketui", "dashboard", "--feed", "bogus"]).is_err());
    }
}
