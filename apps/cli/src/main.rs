//! leadscope CLI: collect business intelligence about a person and their company.
//!
//! Runs the collection pipeline against a company website and/or a
//! professional profile URL and stores one JSON record per run.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; keys may come from the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
