mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_target(false).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Bootstrap { ephemeral, rotate_token, store_path, no_auth, port, bind } => {
            commands::bootstrap(ephemeral, rotate_token, store_path, no_auth, port, bind).await
        }
        Command::Apply { manifest } => commands::apply(manifest, cli.remote, cli.token).await,
        Command::Diff { manifest } => commands::diff(manifest, cli.remote, cli.token).await,
        Command::Status { workload } => commands::status(workload, cli.remote, cli.token).await,
        Command::Graph { output, workload } => commands::graph(output, workload, cli.remote, cli.token).await,
    }
}
