//! CLI parser and config loading.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(name = "konsul")]
#[command(about = "Consultation chat backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP/WebSocket server and the auto-message scheduler (config from env).
    Run {
        /// Overrides BIND_ADDR.
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run one auto-message sweep against the configured database and exit.
    Tick,
    /// Print a signed token for local testing.
    Token {
        #[arg(long)]
        id: String,
        /// admin, dokter or masyarakat
        #[arg(long)]
        role: String,
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

/// Load ServerConfig from environment. If `bind` is provided it overrides BIND_ADDR.
pub fn load_config(bind: Option<String>) -> Result<ServerConfig> {
    ServerConfig::load(bind)
}
