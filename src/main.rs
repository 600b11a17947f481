//! Mimicbot CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use mimicbot::agent::{AgentDeps, Pipeline};
use mimicbot::config::Config;
use mimicbot::llm::{GroqModel, ResponseGenerator};
use mimicbot::messaging::{DiscordAdapter, MessagingDyn};

use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mimicbot")]
#[command(about = "A chat participant that answers in the voice of the channel it sits in")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;

    let _log_guard = mimicbot::logging::init_tracing(cli.debug, config.log_dir.as_deref())
        .context("failed to initialize logging")?;

    tracing::info!(
        model = %config.llm.model,
        activation_keyword = %config.activation_keyword,
        "starting mimicbot"
    );

    let model = GroqModel::new(&config.llm).context("failed to build generation client")?;
    let generator = ResponseGenerator::new(Arc::new(model));

    let adapter: Arc<dyn MessagingDyn> = Arc::new(DiscordAdapter::new(config.discord.token));
    let events = adapter
        .start()
        .await
        .context("failed to connect to Discord")?;

    let deps = AgentDeps::new(adapter.clone(), generator);
    let pipeline = Pipeline::new(deps, config.activation_keyword);

    tokio::select! {
        _ = pipeline.run(events) => {
            tracing::info!("transport closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Err(error) = adapter.shutdown().await {
        tracing::warn!(%error, "adapter shutdown failed");
    }

    tracing::info!("mimicbot stopped");
    Ok(())
}
