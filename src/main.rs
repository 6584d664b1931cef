mod api;
mod chatbot;
mod delivery;
mod insight_cache;
mod presence;
mod registry;
mod service;
mod sweep;

use clap::{Parser, Subcommand};
use lull_core::{config, shellexpand};
use lull_insights::OpenAiInsights;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "lull",
    version,
    about = "lull — sleep wellness companion service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the lull service.
    Start,
    /// Check configuration and data store status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            let generator = Arc::new(OpenAiInsights::from_config(
                cfg.insight.base_url.clone(),
                cfg.insight.api_key.clone(),
                cfg.insight.model.clone(),
            ));

            println!("lull — starting service...");
            let service = service::Service::new(cfg, generator).await?;
            service.run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("lull — status check\n");
            println!("Config: {}", cli.config);
            println!(
                "Listen: {}:{}",
                cfg.server.host, cfg.server.port
            );

            let db_path = shellexpand(&cfg.store.db_path);
            println!(
                "Store:  {} ({})",
                cfg.store.db_path,
                if std::path::Path::new(&db_path).exists() {
                    "present"
                } else {
                    "not created yet"
                }
            );

            println!(
                "Sweep:  {}",
                if cfg.sweep.enabled {
                    format!("daily at {:02}:00", cfg.sweep.hour)
                } else {
                    "disabled".to_string()
                }
            );

            println!(
                "Insights: {} ({})",
                cfg.insight.model,
                if cfg.insight.api_key.is_empty() {
                    "no API key configured"
                } else {
                    "API key configured"
                }
            );
        }
    }

    Ok(())
}
