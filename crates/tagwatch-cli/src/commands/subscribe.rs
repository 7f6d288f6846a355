//! Subscribe and unsubscribe command implementations.
//!
//! Subscriptions are written to the local file store; a running watcher
//! picks them up on its next cycle.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use uuid::Uuid;

use tagwatch_core::{ProviderType, RegistryIdentity, Subscription, DOCKER_HUB_HOST};

use super::GlobalArgs;

/// Arguments for the subscribe command.
#[derive(Args)]
pub struct SubscribeArgs {
    /// Registry provider: dockerhub, acr
    #[arg(long, default_value = "dockerhub")]
    pub registry_type: String,

    /// Registry host (defaults to docker.io for Docker Hub)
    #[arg(long)]
    pub registry: Option<String>,

    /// Repository path (e.g., library/nginx)
    #[arg(long)]
    pub repo: String,

    /// Tag to watch
    #[arg(long, default_value = "latest")]
    pub tag: String,

    /// Webhook URL recorded on the subscription
    #[arg(long)]
    pub webhook: String,

    /// Azure AD tenant id (ACR only)
    #[arg(long, env = "TAGWATCH_AAD_TENANT")]
    pub aad_tenant: Option<String>,

    /// Azure AD client id (ACR only)
    #[arg(long, env = "TAGWATCH_AAD_CLIENT_ID")]
    pub aad_client_id: Option<String>,

    /// Azure AD client secret (ACR only)
    #[arg(long, env = "TAGWATCH_AAD_CLIENT_SECRET", hide_env_values = true)]
    pub aad_client_secret: Option<String>,
}

/// Arguments for the unsubscribe command.
#[derive(Args)]
pub struct UnsubscribeArgs {
    /// Subscription id
    pub id: String,
}

/// Executes the subscribe command.
pub async fn execute(global: &GlobalArgs, args: SubscribeArgs) -> Result<()> {
    let subscription = build_subscription(args)?;
    let store = global.open_store().await?;

    let id = subscription.id.clone();
    let reference = subscription.reference();
    store
        .add_subscription(subscription)
        .await
        .context("Failed to save subscription")?;

    info!(subscription_id = %id, reference = %reference, "Subscription created");
    println!("{id}");
    Ok(())
}

/// Executes the unsubscribe command.
pub async fn remove(global: &GlobalArgs, args: &UnsubscribeArgs) -> Result<()> {
    let store = global.open_store().await?;

    if !store
        .remove_subscription(&args.id)
        .await
        .context("Failed to update store")?
    {
        anyhow::bail!("No subscription with id {}", args.id);
    }

    println!("Removed {}", args.id);
    Ok(())
}

fn build_subscription(args: SubscribeArgs) -> Result<Subscription> {
    let provider = ProviderType::parse(&args.registry_type);
    if let ProviderType::Unknown(name) = &provider {
        anyhow::bail!("Unsupported registry type: {name}");
    }

    let host = match (args.registry, &provider) {
        (Some(host), _) => host,
        (None, ProviderType::DockerHub) => DOCKER_HUB_HOST.to_string(),
        (None, _) => anyhow::bail!("--registry is required for {provider}"),
    };

    let mut identity = RegistryIdentity::new(provider, host);
    identity.aad_tenant = args.aad_tenant;
    identity.aad_client_id = args.aad_client_id;
    identity.aad_client_secret = args.aad_client_secret;

    let subscription = Subscription::new(
        Uuid::now_v7().to_string(),
        identity,
        args.repo,
        args.tag,
        args.webhook,
    );
    subscription.validate()?;
    Ok(subscription)
}
