//! Curator: reconcile local datasets with the content store.
//!
//! # Usage
//!
//! ```text
//! curator import <dataset> <file.json> [--dry-run] [--complete] [--json]
//! curator webhook status [--json]
//! curator webhook enable
//! curator webhook trigger
//! curator config init --space <id> --webhook <id> [--tag <tag>]
//! curator config show
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, import::ImportArgs, webhook::WebhookCommand};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "curator",
    version,
    about = "Import schedule and vendor datasets into the content store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a JSON dataset with the content store and publish the result.
    Import(ImportArgs),

    /// Inspect, re-enable, or fire the deploy webhook guarded during publishes.
    Webhook {
        #[command(subcommand)]
        command: WebhookCommand,
    },

    /// Manage ~/.curator/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Import(args) => args.run(),
        Commands::Webhook { command } => commands::webhook::run(command),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
