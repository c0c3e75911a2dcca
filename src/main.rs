//! varsync - surgical value propagation between configuration files.
//!
//! Entry point: loads the rules document, initializes tracing, and
//! runs the watch-mode service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use varsync::sync::SyncService;
use varsync::{config, Result, RulesFile};

/// Watch structured config files and surgically propagate values
/// between them.
#[derive(Parser, Debug)]
#[command(name = "varsync")]
#[command(version)]
#[command(about = "Sync values between JSON, YAML, TOML, and dotenv files")]
struct Cli {
    /// Rules file path
    #[arg(
        short,
        long,
        env = "VARSYNC_CONFIG",
        default_value = "varsync.json"
    )]
    config: PathBuf,

    /// Start file watching mode
    #[arg(long)]
    watch: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, env = "VARSYNC_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let document = match config::load(&cli.config) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("Failed to load rules file: {err}");
            RulesFile::default()
        }
    };

    init_tracing(&document, cli.log_level.as_deref())?;

    tracing::info!("varsync v{}", env!("CARGO_PKG_VERSION"));

    if cli.watch {
        return SyncService::new(&document).run().await;
    }

    Cli::command().print_help()?;
    Ok(())
}

/// Console logging by default; with a log file configured, everything
/// goes to the file and only warnings and errors reach the console.
fn init_tracing(document: &RulesFile, override_level: Option<&str>) -> Result<()> {
    let default_level = if document.debug { "debug" } else { "info" };
    let level = override_level.unwrap_or(default_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if document.log_file.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&document.log_file)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .with(fmt::layer().with_filter(LevelFilter::WARN))
            .init();
    }
    Ok(())
}
