//! CLI commands and argument parsing.

pub mod check;
pub mod list;
pub mod run;
pub mod subscribe;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tagwatch_registry::DockerHubCredentials;
use tagwatch_watcher::{FileStore, NotificationConfig, WatcherConfig};

/// Tagwatch - container registry tag change watcher
#[derive(Parser)]
#[command(name = "tagwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll registries on the configured interval until interrupted
    Run,

    /// Run a single poll cycle and print the report
    Check(check::CheckArgs),

    /// Add a subscription
    Subscribe(subscribe::SubscribeArgs),

    /// Remove a subscription
    Unsubscribe(subscribe::UnsubscribeArgs),

    /// List subscriptions
    List(list::ListArgs),

    /// Print version information
    Version,
}

/// Options shared by every command.
#[derive(Args, Default)]
pub struct GlobalArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, env = "TAGWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store directory (overrides `store.path`)
    #[arg(long, global = true, env = "TAGWATCH_STORE")]
    pub store: Option<PathBuf>,

    /// Docker Hub username
    #[arg(long, global = true, env = "TAGWATCH_DOCKERHUB_USERNAME")]
    pub dockerhub_username: Option<String>,

    /// Docker Hub password or access token
    #[arg(long, global = true, env = "TAGWATCH_DOCKERHUB_PASSWORD", hide_env_values = true)]
    pub dockerhub_password: Option<String>,

    /// Event Grid topic endpoint
    #[arg(long, global = true, env = "TAGWATCH_TOPIC_ENDPOINT")]
    pub topic_endpoint: Option<String>,

    /// Event Grid topic access key
    #[arg(long, global = true, env = "TAGWATCH_TOPIC_KEY", hide_env_values = true)]
    pub topic_key: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Loads the configuration file (or defaults) and applies overrides.
    pub fn load_config(&self) -> Result<WatcherConfig> {
        let mut config = match &self.config {
            Some(path) => WatcherConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => WatcherConfig::default(),
        };

        if let Some(store) = &self.store {
            config.store.path.clone_from(store);
        }

        match (&self.dockerhub_username, &self.dockerhub_password) {
            (Some(username), Some(password)) => {
                config.registry.docker_hub =
                    Some(DockerHubCredentials::new(username.clone(), password.clone()));
            }
            (None, None) => {}
            _ => anyhow::bail!(
                "--dockerhub-username and --dockerhub-password must be given together"
            ),
        }

        match (&self.topic_endpoint, &self.topic_key) {
            (Some(endpoint), Some(key)) => {
                config.notification = NotificationConfig::event_grid(endpoint.clone(), key.clone());
            }
            (None, None) => {}
            _ => anyhow::bail!("--topic-endpoint and --topic-key must be given together"),
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Opens the configured store.
    pub async fn open_store(&self) -> Result<FileStore> {
        let config = self.load_config()?;
        FileStore::open(&config.store.path)
            .await
            .with_context(|| format!("Failed to open store at {}", config.store.path.display()))
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
