mod cli;
mod command;

use clap::Parser;
use cli::{Cli, Commands};
use importbox::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    importbox::observability::init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Import(args) => command::import(&config, args).await?,
    }

    Ok(())
}
