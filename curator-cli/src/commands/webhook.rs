//! `curator webhook status|enable|trigger`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use curator_core::Config;
use curator_store::{ContentStore, UreqTransport};

use super::load_config;

#[derive(Subcommand, Debug)]
pub enum WebhookCommand {
    /// Show whether the configured deploy webhook is active.
    Status(StatusArgs),
    /// Re-enable the deploy webhook, e.g. after an interrupted publish.
    Enable,
    /// Fire the deploy webhook once by hand.
    Trigger,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct WebhookStatusJson<'a> {
    id: &'a str,
    active: bool,
    url: &'a str,
    version: u64,
}

pub fn run(cmd: WebhookCommand) -> Result<()> {
    match cmd {
        WebhookCommand::Status(args) => status(args),
        WebhookCommand::Enable => enable(),
        WebhookCommand::Trigger => trigger(),
    }
}

fn connect() -> Result<(Config, ContentStore<UreqTransport>)> {
    let config = load_config()?;
    let store = ContentStore::from_config(&config)
        .context("failed to build content store client")?;
    Ok((config, store))
}

fn status(args: StatusArgs) -> Result<()> {
    let (config, store) = connect()?;
    let state = store
        .get_webhook_state(&config.webhook_id)
        .with_context(|| format!("failed to read webhook '{}'", config.webhook_id))?;

    if args.json {
        let payload = WebhookStatusJson {
            id: &config.webhook_id,
            active: state.active,
            url: &state.url,
            version: state.version,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize webhook JSON")?
        );
        return Ok(());
    }

    let flag = if state.active {
        "ACTIVE".green().bold()
    } else {
        "INACTIVE".red().bold()
    };
    println!("webhook {} {flag}", config.webhook_id);
    println!("  url:     {}", state.url);
    println!("  version: {}", state.version);
    if !state.active {
        println!("A publish may have been interrupted; run `curator webhook enable`.");
    }
    Ok(())
}

fn enable() -> Result<()> {
    let (config, store) = connect()?;
    let state = store
        .enable_webhook(&config.webhook_id)
        .with_context(|| format!("failed to enable webhook '{}'", config.webhook_id))?;
    println!(
        "{} webhook {} active (version {})",
        "✓".green(),
        config.webhook_id,
        state.version
    );
    Ok(())
}

fn trigger() -> Result<()> {
    let (config, store) = connect()?;
    let status = store
        .fire_webhook(&config.webhook_id)
        .with_context(|| format!("failed to trigger webhook '{}'", config.webhook_id))?;
    println!("{} webhook {} triggered ({status})", "✓".green(), config.webhook_id);
    Ok(())
}
