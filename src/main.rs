//! Main entry point for the feed-downloader CLI

use clap::Parser;
use feed_downloader::cancel::CancelSignal;
use feed_downloader::cli::Cli;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_downloader=info"));

    // stdout carries command output, logs go to stderr
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = feed_downloader::metrics::init_metrics(addr) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(2);
        }
    }

    let cancel = CancelSignal::shared();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - cancelling download...");
                cancel.cancel();
            }
        }
    });

    if let Err(e) = cli.execute(cancel).await {
        let code = e.exit_code();
        let e = anyhow::Error::new(e);
        error!("Command failed: {:#}", e);
        std::process::exit(code);
    }
}
