use anyhow::Result;
use clap::Parser;
use confsync::SyncError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::run(args).await,
        Commands::Print(args) => commands::print::run(args),
        Commands::Destroy(args) => commands::destroy::run(args).await
    };

    if let Err(error) = result {
        if error
            .downcast_ref::<SyncError>()
            .is_some_and(SyncError::is_local)
        {
            output::hint("Nothing was written to the parameter store");
        }
        return Err(error);
    }
    Ok(())
}
