//! Command-line parsing for the reference-data desk.
//!
//! Parsing lives here; dispatch lives in [`crate::app`].

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::DataType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "refdesk", version, about = "Financial reference-data desk: API server and console")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API and keep the datasets refreshed on schedule.
    Serve(ServeArgs),
    /// Launch the terminal console against a running server.
    Console(ConsoleArgs),
    /// Generate a dataset and print a per-symbol summary.
    Show(DatasetArgs),
    /// Generate a dataset and write it to CSV.
    Export(ExportArgs),
}

/// Server options. Flags override the config file and environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// TOML config file.
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// JSON file backing reviews.
    #[arg(long, value_name = "JSON")]
    pub store: Option<PathBuf>,

    /// Seed for reproducible generated data.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Days of history in each dataset.
    #[arg(long)]
    pub history_days: Option<usize>,

    /// Pause between pull-task steps, in milliseconds.
    #[arg(long)]
    pub step_millis: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ConsoleArgs {
    /// Server base URL (defaults to $REFDESK_URL, then http://127.0.0.1:3000).
    #[arg(long)]
    pub url: Option<String>,

    /// Where console logs go.
    #[arg(long, value_name = "FILE", default_value = "refdesk-console.log")]
    pub log_file: PathBuf,
}

/// Which dataset to generate.
#[derive(Debug, Clone, Args)]
pub struct DatasetArgs {
    /// Data type (industry, etf, stock).
    #[arg(short = 't', long = "type", value_enum)]
    pub kind: DataType,

    /// Days of history.
    #[arg(long, default_value_t = 30)]
    pub days: usize,

    /// Newest date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub asof: Option<NaiveDate>,

    /// Random seed; omitted means a fresh random dataset.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_export() {
        let cli = Cli::parse_from([
            "refdesk", "export", "--type", "etf", "--days", "5", "--seed", "3", "--out", "etf.csv",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.dataset.kind, DataType::Etf);
        assert_eq!(args.dataset.days, 5);
        assert_eq!(args.dataset.seed, Some(3));
        assert_eq!(args.out, PathBuf::from("etf.csv"));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(Cli::try_parse_from(["refdesk", "show", "--type", "bond"]).is_err());
    }

    #[test]
    fn serve_flags_are_optional() {
        let cli = Cli::parse_from(["refdesk", "serve", "--port", "8080"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(8080));
        assert!(args.config.is_none());
    }
}
