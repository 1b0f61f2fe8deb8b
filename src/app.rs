//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module parses the
//! command line, sets up logging and dispatches to the server, the console or
//! the one-shot dataset commands.

use chrono::{Local, NaiveDate};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::cli::{Cli, Command, ConsoleArgs, DatasetArgs, ExportArgs, ServeArgs};
use crate::client::DeskClient;
use crate::config::DeskConfig;
use crate::domain::DataPoint;
use crate::error::AppError;
use crate::logging;

/// Entry point for the `refdesk` binary.
pub fn run() -> Result<(), AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    match cli.command {
        Command::Serve(args) => handle_serve(args),
        Command::Console(args) => handle_console(args),
        Command::Show(args) => handle_show(args),
        Command::Export(args) => handle_export(args),
    }
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    logging::init_stderr(logging::SERVER_FILTER);

    let mut config = DeskConfig::load(args.config.as_deref())?;
    apply_serve_args(&mut config, &args);
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start async runtime: {e}")))?;
    runtime.block_on(crate::server::serve(config))
}

fn handle_console(args: ConsoleArgs) -> Result<(), AppError> {
    let _guard = logging::init_file(&args.log_file)?;
    let client = match args.url {
        Some(url) => DeskClient::new(url),
        None => DeskClient::from_env(),
    };
    info!(url = client.base_url(), "starting console");
    crate::tui::run(client)
}

fn handle_show(args: DatasetArgs) -> Result<(), AppError> {
    logging::init_stderr(logging::CLI_FILTER);
    let points = generate_dataset(&args)?;
    let summary = crate::report::summarize(args.kind, &points);
    println!("{}", crate::report::format_summary(&summary));
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    logging::init_stderr(logging::CLI_FILTER);
    let points = generate_dataset(&args.dataset)?;
    crate::io::export::write_dataset_csv(&args.out, args.dataset.kind, &points)?;
    println!("Wrote {} {} points to {}", points.len(), args.dataset.kind, args.out.display());
    Ok(())
}

fn generate_dataset(args: &DatasetArgs) -> Result<Vec<DataPoint>, AppError> {
    if args.days == 0 {
        return Err(AppError::new(2, "--days must be > 0."));
    }
    let asof: NaiveDate = args.asof.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(crate::data::generate(args.kind, &mut rng, asof, args.days))
}

/// Flags win over the config file and environment.
fn apply_serve_args(config: &mut DeskConfig, args: &ServeArgs) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(store) = &args.store {
        config.store.path = store.clone();
    }
    if let Some(seed) = args.seed {
        config.schedule.seed = Some(seed);
    }
    if let Some(days) = args.history_days {
        config.schedule.history_days = days;
    }
    if let Some(step) = args.step_millis {
        config.tasks.step_millis = step;
    }
}

/// Rewrite argv so a bare `refdesk` (or `refdesk --port 8080`) means `serve`.
///
/// Rules:
/// - `refdesk`                     -> `refdesk serve`
/// - `refdesk --port 8080 ...`     -> `refdesk serve --port 8080 ...`
/// - `refdesk --help/--version/-h` -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("serve".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "serve".to_string());
    }
    argv
}
