//! `curator import <dataset> <file.json>`: reconcile and publish a dataset.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use curator_core::{EntryId, ReconciliationResult};
use curator_store::ContentStore;
use curator_sync::{pipeline, DatasetType, RunOptions, TracingSink};

use super::load_config;

/// Arguments for `curator import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Dataset type: schedule | foodVendors.
    pub dataset: String,

    /// JSON file holding an array of records.
    pub file: PathBuf,

    /// Compute and print the diff without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// The file is the full dataset; archive remote entries it does not mention.
    #[arg(long)]
    pub complete: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ImportReportJson<'a> {
    dataset: &'a str,
    dry_run: bool,
    complete: bool,
    elapsed_ms: u128,
    #[serde(flatten)]
    result: &'a ReconciliationResult,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "entries")]
    count: usize,
    #[tabled(rename = "ids")]
    ids: String,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let dataset_type: DatasetType = self.dataset.parse()?;
        let dataset = pipeline::read_dataset(&self.file)
            .with_context(|| format!("cannot import '{}'", self.file.display()))?;

        let config = load_config()?;
        let store = ContentStore::from_config(&config)
            .context("failed to build content store client")?;
        let options = RunOptions {
            dry_run: self.dry_run,
            complete: self.complete,
            generation_tag: config.generation_tag.clone(),
            webhook_id: config.webhook_id.clone(),
        };

        let started = Instant::now();
        let result = pipeline::run(&store, dataset_type, &dataset, &options, &mut TracingSink)
            .with_context(|| format!("import of {dataset_type} failed"))?;
        let elapsed = started.elapsed();

        if self.json {
            let payload = ImportReportJson {
                dataset: dataset_type.as_str(),
                dry_run: self.dry_run,
                complete: self.complete,
                elapsed_ms: elapsed.as_millis(),
                result: &result,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize import JSON")?
            );
        } else {
            print_summary(dataset_type, &result, self.dry_run, elapsed);
        }

        if !result.is_clean() {
            bail!("{} record(s) failed during import", result.errors.len());
        }
        Ok(())
    }
}

fn print_summary(
    dataset: DatasetType,
    result: &ReconciliationResult,
    dry_run: bool,
    elapsed: Duration,
) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let headline = format!("{prefix}✓ imported {dataset} in {:.1}s", elapsed.as_secs_f64());
    if result.is_clean() {
        println!("{}", headline.green());
    } else {
        println!("{}", headline.yellow());
    }

    let rows = vec![
        SummaryRow {
            action: "created".green().to_string(),
            count: result.created.len(),
            ids: summarize_ids(&result.created),
        },
        SummaryRow {
            action: "updated".cyan().to_string(),
            count: result.updated.len(),
            ids: summarize_ids(&result.updated),
        },
        SummaryRow {
            action: "archived".magenta().to_string(),
            count: result.archived.len(),
            ids: summarize_ids(&result.archived),
        },
        SummaryRow {
            action: "unaffected".bright_black().to_string(),
            count: result.unaffected,
            ids: String::new(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if !result.errors.is_empty() {
        println!("{}", format!("{} error(s):", result.errors.len()).red().bold());
        for error in &result.errors {
            println!("  ✗  {error}");
        }
    }
}

fn summarize_ids(ids: &[EntryId]) -> String {
    let mut names: Vec<String> = ids.iter().take(3).map(ToString::to_string).collect();
    if ids.len() > names.len() {
        names.push(format!("+{} more", ids.len() - names.len()));
    }
    names.join(", ")
}
