//! List command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tagwatch_core::Subscription;
use tagwatch_watcher::SubscriptionStore;

use super::{GlobalArgs, OutputFormat};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Output format: text, json
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Subscription as printed, without secrets.
#[derive(Debug, Serialize)]
struct SubscriptionView<'a> {
    id: &'a str,
    provider: &'a str,
    registry: &'a str,
    repository: &'a str,
    tag: &'a str,
    webhook_url: &'a str,
}

impl<'a> From<&'a Subscription> for SubscriptionView<'a> {
    fn from(subscription: &'a Subscription) -> Self {
        Self {
            id: &subscription.id,
            provider: subscription.registry.provider.as_str(),
            registry: &subscription.registry.host,
            repository: &subscription.repository,
            tag: &subscription.tag,
            webhook_url: &subscription.webhook_url,
        }
    }
}

/// Executes the list command.
pub async fn execute(global: &GlobalArgs, args: &ListArgs) -> Result<()> {
    let store = global.open_store().await?;
    let subscriptions = store
        .list_subscriptions()
        .await
        .context("Failed to read subscriptions")?;
    let views: Vec<SubscriptionView<'_>> = subscriptions.iter().map(SubscriptionView::from).collect();

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&views)?),
        OutputFormat::Text => {
            if views.is_empty() {
                println!("No subscriptions.");
            }
            for view in &views {
                println!(
                    "{:<36}  {:<24} {}/{}:{}  -> {}",
                    view.id,
                    view.provider,
                    view.registry,
                    view.repository,
                    view.tag,
                    view.webhook_url
                );
            }
        }
    }

    Ok(())
}
