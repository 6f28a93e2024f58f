//! CLI command for warming the cache from a seed dates file

use crate::config::ENV_SEED_DATES;
use crate::shutdown::SharedShutdown;
use crate::warmer::{CacheWarmer, FailurePolicy, WarmReport};
use crate::Rover;
use clap::Args;
use std::path::PathBuf;

use super::{Cli, CliError, OutputFormat};

/// Warm command arguments
#[derive(Debug, Args)]
pub struct WarmArgs {
    /// File with one date per line
    #[arg(long, env = ENV_SEED_DATES)]
    pub seed_dates: Option<PathBuf>,

    /// Rover to warm (repeatable; default: all rovers)
    #[arg(long = "rover")]
    pub rovers: Vec<Rover>,

    /// Log failed dates and continue instead of stopping
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,
}

impl WarmArgs {
    /// Execute the warm command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let mut settings = cli.settings();
        settings.seed_dates_file = self.seed_dates.clone();

        let seed_file = settings.seed_dates_file.clone().ok_or_else(|| {
            CliError::ConfigurationError(format!(
                "no seed dates file configured (use --seed-dates or {ENV_SEED_DATES})"
            ))
        })?;

        let policy = if self.keep_going {
            FailurePolicy::SkipAndContinue
        } else {
            FailurePolicy::Abort
        };

        let mut warmer = CacheWarmer::new(settings.build_downloader()?).with_policy(policy);
        if !self.rovers.is_empty() {
            warmer = warmer.with_rovers(self.rovers.clone());
        }

        let report = warmer.warm(&seed_file, &shutdown).await?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
            OutputFormat::Human => output_human(&report),
        }
        Ok(())
    }
}

fn output_human(report: &WarmReport) {
    println!("\nCache warm-up completed");
    println!("Dates read: {}", report.dates_read);
    println!("Rover/dates completed: {}", report.completed.len());
    println!("Photos downloaded: {}", report.downloaded());
    if !report.failures.is_empty() {
        println!("Failures skipped: {}", report.failures.len());
        for failure in &report.failures {
            println!("  {} {}: {}", failure.rover, failure.date, failure.error);
        }
    }
}
