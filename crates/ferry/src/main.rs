//! Ferry - Event function runtime for Bulker destinations
//!
//! # Usage
//!
//! ```bash
//! # Run the configured chain for one event and deliver it to Bulker
//! ferry run --config ferry.toml --event event.json
//! cat event.json | ferry run --config ferry.toml
//!
//! # Show the rows a layout produces, without delivery
//! ferry map --layout segment --event event.json
//!
//! # Convert between the canonical and classic schemas
//! ferry classic encode --event event.json
//! ferry classic decode --event classic.json
//! ```

mod cmd;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ferry_config::{Config, LogConfig, LogFormat, LogLevel, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Ferry - Event function runtime for Bulker destinations
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the function chain and deliver to Bulker
    Run(cmd::run::RunArgs),

    /// Print the rows a data layout produces for an event
    Map(cmd::map::MapArgs),

    /// Convert events to and from the classic schema
    Classic(cmd::classic::ClassicArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let mut log = config.as_ref().map(|c| c.log.clone()).unwrap_or_default();
    if let Some(level) = cli.log_level {
        log.level = level;
    }
    init_logging(&log)?;

    match cli.command {
        Command::Run(args) => {
            let config = config.context("run requires --config")?;
            cmd::run::run(config, args).await
        }
        Command::Map(args) => {
            cmd::map::run(config.as_ref(), args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Classic(args) => {
            cmd::classic::run(args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    path.map(|path| {
        Config::from_file(path).with_context(|| format!("failed to load {}", path.display()))
    })
    .transpose()
}

/// Initialize the tracing subscriber for logging
fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.filter_directive())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match &config.output {
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_writer(writer))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .init(),
    }

    Ok(())
}
