use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod error;
mod git;
mod prompt;
mod session;
mod utils;

use cli::{Cli, Commands};
use config::Config;
use error::WtmError;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WTM_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves to the process exit code; non-zero only when an attached tmux
/// client exited with one.
async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config)?;

    match cli.command {
        Commands::Create(args) => commands::create::execute(args, config).await,
        Commands::Checkout(args) => commands::checkout::execute(args, config).await,
        Commands::Session(args) => commands::session::execute(args, config).await,
        Commands::List(args) => commands::list::execute(args).await.map(|()| 0),
        Commands::Remove(args) => commands::remove::execute(args, config).await.map(|()| 0),
        Commands::Sessions => commands::sessions::execute().await.map(|()| 0),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            match err.downcast_ref::<WtmError>() {
                Some(e) if e.is_cancelled() => eprintln!("{}", e.report()),
                Some(e) => eprintln!("Error: {}", e.report()),
                None => eprintln!("Error: {:#}", err),
            }
            std::process::exit(1);
        }
    }
}
