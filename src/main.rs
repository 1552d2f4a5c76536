#![warn(clippy::pedantic)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod command;
mod constants;
mod event;
#[cfg(test)]
mod fixtures;
mod forge;
mod git;
mod patch;
mod repo_cache;
mod server;
mod utils;
mod webhook;
mod workflow;

#[tokio::main]
async fn main() -> Result<()> {
    cli::init_tracing();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Commands::Serve(args) => {
            server::serve(args).await?;
        }
    }
    Ok(())
}
