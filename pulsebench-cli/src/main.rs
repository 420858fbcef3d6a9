// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Pulsebench CLI
//!
//! Command-line interface and HTTP/WebSocket front end for the pulsebench
//! harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod harness;
mod server;

/// Pulsebench - resource-instrumented load generator
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (environment only when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Benchmarks runnable from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunKind {
    Http,
    Database,
    /// Sequential in-process entity generation
    Synthesize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server
    Serve {
        /// Override the bind address from configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one benchmark in process and print its metrics
    Run {
        /// Benchmark to run
        #[arg(value_enum)]
        kind: RunKind,

        /// Persist the metrics record
        #[arg(long)]
        stateful: bool,

        /// Override the configured fan-out width
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// List persisted metrics records
    Records {
        /// Only show records for this endpoint id
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Write the records to a JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Validate configuration
    Validate {
        /// Path to the configuration file
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> commands::CommandResult {
    let cli = Cli::parse();

    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let config = cli.config.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Serve { bind } => commands::serve::execute(config, bind.as_deref()).await,
        Commands::Run {
            kind,
            stateful,
            width,
        } => commands::run::execute(config, kind, stateful, width).await,
        Commands::Records { endpoint, export } => {
            commands::records::execute(config, endpoint.as_deref(), export.as_deref()).await
        }
        Commands::Validate { file } => {
            commands::validate::execute(file.as_deref().or(config)).await
        }
    }
}
