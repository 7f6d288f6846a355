//! Tagwatch CLI - watches container registry tags and announces digest changes.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.log_format);

    match cli.command {
        Commands::Run => commands::run::execute(&cli.global).await,
        Commands::Check(args) => commands::check::execute(&cli.global, &args).await,
        Commands::Subscribe(args) => commands::subscribe::execute(&cli.global, args).await,
        Commands::Unsubscribe(args) => commands::subscribe::remove(&cli.global, &args).await,
        Commands::List(args) => commands::list::execute(&cli.global, &args).await,
        Commands::Version => {
            println!("tagwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tagwatch=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
