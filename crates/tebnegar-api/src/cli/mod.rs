//! CLI command definitions for the `tebnegar` binary.
//!
//! Uses clap derive macros. `serve` runs the REST API; the remaining
//! commands are operator utilities against the same data directory.

pub mod check;
pub mod stats;

use clap::{Parser, Subcommand};

/// Symptom-checker chat backend.
#[derive(Parser)]
#[command(name = "tebnegar", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug-level logging (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Export spans through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Address to bind (defaults to `server.host` from config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to `server.port` from config.toml).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show dashboard counts from the database.
    Stats,

    /// Send one minimal completion to the configured LLM provider.
    Check,
}
