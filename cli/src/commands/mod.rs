pub mod deploy;
pub mod destroy;
pub mod print;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "confsync",
    author,
    version,
    about = "Sync YAML configuration trees into the AWS SSM Parameter Store",
    long_about = "Flattens a directory of YAML documents into path-scoped parameters, diffs \
                  them against a snapshot of the store, and applies the difference: changed \
                  values are written, orphaned names are deleted, matches are left alone."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Reconcile the config tree into the parameter store")]
    Deploy(deploy::DeployArgs),

    #[command(about = "Render the flattened config tree without touching the store")]
    Print(print::PrintArgs),

    #[command(about = "Delete every parameter the config tree defines")]
    Destroy(destroy::DestroyArgs)
}
