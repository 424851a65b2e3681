mod cli;
mod config;
mod error;
mod github;
mod gitlab;
mod grouping;
mod models;
mod output;
mod prompts;
mod registry;
mod workflow;

use std::process;

use anyhow::Result;
use clap::Parser;

use cli::{CleanArgs, Cli, Command};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Credentials may live in a local .env from a previous run.
    dotenvy::dotenv().ok();

    match cli.command {
        Some(Command::Clean(args)) => workflow::run_clean(&args, cli.verbose).await,
        Some(Command::List(args)) => workflow::run_list(&args, cli.verbose).await,
        None => workflow::run_clean(&CleanArgs::default(), cli.verbose).await,
    }
}
