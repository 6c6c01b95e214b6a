//! Mosaic CLI - inspect entries, scope stylesheets and simulate navigation.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod config_bridge;
mod theme;

use commands::{config, inspect, scope, simulate};
use theme::Theme;

/// Mosaic - micro-frontend orchestrator
#[derive(Parser)]
#[command(name = "mosaic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file (defaults to ./mosaic.toml when present)
    #[arg(short, long, global = true, env = "MOSAIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an entry document and list its scripts and styles
    Inspect {
        /// Absolute URL of the entry document
        entry: String,
    },

    /// Scope a stylesheet under an application namespace
    Scope {
        /// Stylesheet to rewrite
        file: PathBuf,

        /// Application name, or `.class` for a literal namespace class
        #[arg(short, long)]
        namespace: String,
    },

    /// Navigate through paths with the configured applications
    Simulate {
        /// Paths to visit, in order
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print the final status board as JSON
        #[arg(long)]
        json: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = mosaic_config::Config::load(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = match &resolved {
        Ok(r) => {
            let mut lc = config_bridge::to_log_config(&r.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            let level = if cli.verbose { "debug" } else { "warn" };
            mosaic_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = mosaic_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("Invalid configuration: {e}")));
            std::process::exit(2);
        },
    };
    let cfg = &resolved.config;

    match cli.command {
        Commands::Inspect { entry } => {
            inspect::run_inspect(&entry, &config_bridge::to_fetch_settings(cfg)).await?;
        },
        Commands::Scope { file, namespace } => {
            scope::run_scope(&file, &namespace)?;
        },
        Commands::Simulate { paths, json } => {
            simulate::run_simulate(cfg, &paths, json).await?;
        },
        Commands::Config {
            command: ConfigCommands::Show { format },
        } => {
            config::run_show(&resolved, &format)?;
        },
    }

    Ok(())
}
