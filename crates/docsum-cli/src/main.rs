//! Command-line entry point: summarize one document and print the summary
//!
//! Configuration comes from the file named by `DOCSUM_CONFIG` or from
//! `docsum.yaml` in the working directory; logging honours `RUST_LOG` on top
//! of the configured level. Logs go to stderr, the summary to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use docsum_core::{
    config::ConfigLoader, create_gateway, document, CancellationToken, SummarizeEngine,
};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Summarizes a document with a chat-completion model.")]
struct Cli {
    /// Provide the path to a document to summarize.
    filename: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::discover()
        .await
        .context("Failed to load configuration")?;

    let log_level_filter = config.logging.level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .parse_default_env()
        .init();

    log::info!(
        "Using model {} at {}",
        config.llm.model,
        config.llm.provider.base_url()
    );

    let text = document::load(&cli.filename)
        .await
        .with_context(|| format!("Failed to load document {}", cli.filename.display()))?;

    let gateway = create_gateway(&config.llm)?;
    let engine = SummarizeEngine::from_config(gateway, &config);

    let cancel = CancellationToken::new();
    if let Some(secs) = config.timeout_secs {
        let timer = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::warn!("Summarization exceeded {}s, cancelling", secs);
            timer.cancel();
        });
    }

    let summary = engine
        .summarize_with_cancellation(&text, &cancel)
        .await
        .context("Summarization failed")?;

    println!("{}", summary);
    Ok(())
}
