//! Check command implementation.
//!
//! Runs a single poll cycle and prints its report.

use anyhow::{Context, Result};
use clap::Args;
use tagwatch_watcher::{CycleReport, OutcomeStatus, Watcher};

use super::{GlobalArgs, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Log change events instead of delivering them and keep the stored
    /// baseline untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Output format: text, json
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Executes the check command.
pub async fn execute(global: &GlobalArgs, args: &CheckArgs) -> Result<()> {
    let config = global.load_config()?;

    let watcher = if args.dry_run {
        Watcher::dry_run(config).await
    } else {
        Watcher::open(config).await
    }
    .context("Failed to start watcher")?;

    let report = watcher.check_once().await.context("Poll cycle failed")?;

    match args.output {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.failed_count() > 0 {
        anyhow::bail!("{} subscription check(s) failed", report.failed_count());
    }
    Ok(())
}

fn print_text_report(report: &CycleReport) {
    println!("Cycle {} ({} ms)", report.cycle_id, report.duration.as_millis());
    println!();

    if report.outcomes.is_empty() {
        println!("No subscriptions.");
        return;
    }

    for outcome in &report.outcomes {
        let detail = match &outcome.status {
            OutcomeStatus::Checked(detection) => {
                format!("{:<9} {}", detection.as_str(), detection.digest())
            }
            OutcomeStatus::Failed { kind, message } => format!("{:<9} {kind}: {message}", "failed"),
        };
        println!(
            "  {:<36} {}/{:<30} {detail}",
            outcome.subscription_id, outcome.registry, outcome.reference
        );
    }

    println!();
    println!(
        "new: {}  updated: {}  unchanged: {}  failed: {}",
        report.new_count(),
        report.updated_count(),
        report.unchanged_count(),
        report.failed_count()
    );
}
