//! `konsul` binary: run the server, run one auto-message sweep, or issue a development token.

use anyhow::Result;
use clap::Parser;
use konsul_server::{issue_token, load_config, run_server, run_tick, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bind } => {
            let config = load_config(bind)?;
            run_server(config).await
        }
        Commands::Tick => {
            let config = load_config(None)?;
            run_tick(config).await
        }
        Commands::Token { id, role, ttl_hours } => {
            let config = load_config(None)?;
            let token = issue_token(&config, &id, &role, ttl_hours)?;
            println!("{}", token);
            Ok(())
        }
    }
}
