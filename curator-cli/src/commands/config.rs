//! `curator config init` and `curator config show`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use curator_core::config;

use super::home_dir;

/// Manage the Curator config file.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write ~/.curator/config.yaml if it does not exist yet.
    Init(InitArgs),

    /// Print the active configuration.
    Show,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Content store space ID.
    #[arg(long)]
    pub space: Option<String>,

    /// ID of the deploy webhook to disable during publishes.
    #[arg(long)]
    pub webhook: Option<String>,

    /// Generation tag scoping imported entries (defaults to `year<current year>`).
    #[arg(long)]
    pub tag: Option<String>,
}

pub fn run(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Init(args) => init(args),
        ConfigCommand::Show => show(),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let home = home_dir()?;
    let path = config::config_path_at(&home);

    if path.exists() {
        let existing = config::load_at(&home).context("failed to load existing config")?;
        println!("✓ Config already exists at {}", path.display());
        println!("  space: {}  webhook: {}", existing.space_id, existing.webhook_id);
        return Ok(());
    }

    let (Some(space), Some(webhook)) = (args.space.as_deref(), args.webhook.as_deref()) else {
        bail!("--space and --webhook are required to create {}", path.display());
    };
    if let Some(tag) = args.tag.as_deref() {
        validate_tag(tag)?;
    }

    let created = config::init_at(&home, space, webhook, args.tag)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    println!("  generation tag: {}", created.generation_tag);
    println!("  token is read from ${}", created.token_env);
    Ok(())
}

fn show() -> Result<()> {
    let home = home_dir()?;
    let config = config::load_at(&home).context("failed to load config")?;
    let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;

    println!("# {}", config::config_path_at(&home).display());
    print!("{yaml}");
    let token = if config.token().is_ok() { "set" } else { "not set" };
    println!("# ${} is {token}", config.token_env);
    Ok(())
}

/// Tags are store identifiers: ASCII letters, digits, `-`, `_`, `.`.
fn validate_tag(tag: &str) -> Result<()> {
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        bail!("invalid generation tag '{tag}': use letters, digits, '-', '_' or '.'");
    }
    Ok(())
}
