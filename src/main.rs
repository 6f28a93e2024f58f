//! Main entry point for the mars-photo-downloader CLI

use anyhow::Context;
use clap::Parser;
use mars_photo_downloader::cli::{Cli, CliError, Commands};
use mars_photo_downloader::metrics::init_metrics;
use mars_photo_downloader::shutdown::ShutdownCoordinator;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// Logs go to stderr so stdout stays clean for `--output-format json`.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mars_photo_downloader=info"));

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
        let installed = init_metrics(addr)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("metrics endpoint {addr} unavailable"));
        if let Err(e) = installed {
            warn!("Metrics disabled: {e:#}");
        }
    }

    // One cancellation signal for the whole invocation
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - finishing in-flight photos and stopping");
                shutdown.request_shutdown();
            }
        }
    });

    let result: Result<(), CliError> = match &cli.command {
        Commands::Download(args) => args.execute(&cli, shutdown.clone()).await,
        Commands::Warm(args) => args.execute(&cli, shutdown.clone()).await,
        Commands::List(args) => args.execute(&cli),
    };

    if let Err(e) = result {
        if e.is_cancelled() {
            warn!("Command cancelled");
            eprintln!("Cancelled. Finished photos were kept; the run is resumable, re-run the same command.");
        } else {
            error!("Command failed: {}", e);
            eprintln!("ERROR: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
