use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "workloadctl", about = "Drive the workload orchestration control plane", version)]
pub struct Cli {
    /// Base URL of a running scoreplane-api server.
    #[arg(long, env = "SCOREPLANE_URL", global = true, default_value = "http://localhost:8080")]
    pub remote: String,

    /// Bearer token for the server. Falls back to `~/.scoreplane/token`.
    #[arg(long, env = "SCOREPLANE_TOKEN", global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP admission/inspection surface and the reconcile loop.
    Bootstrap {
        /// Run with an in-memory store instead of the persistent redb file.
        #[arg(long)]
        ephemeral: bool,

        /// Generate and write a fresh token even if one already exists.
        #[arg(long)]
        rotate_token: bool,

        /// Path to the redb store file (ignored with --ephemeral).
        #[arg(long)]
        store_path: Option<String>,

        /// Disable bearer-token auth entirely. Never use outside local development.
        #[arg(long)]
        no_auth: bool,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Upsert a Workload from a manifest file and trigger a reconcile.
    Apply {
        /// Path to a Workload manifest (`metadata.namespace`, `metadata.name`, `spec`).
        manifest: PathBuf,
    },

    /// Preview the effect of a manifest without applying it.
    Diff {
        manifest: PathBuf,
    },

    /// Show status for one Workload, or all of them if none is named.
    Status {
        /// `namespace/name`. Omit to list every Workload.
        workload: Option<String>,
    },

    /// Render the claim/plan/exposure graph for one or all Workloads.
    Graph {
        #[arg(long, default_value = "text")]
        output: GraphOutput,

        /// `namespace/name`. Omit to render every Workload.
        workload: Option<String>,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphOutput {
    Text,
    Json,
    Dot,
}
