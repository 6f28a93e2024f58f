//! Download command implementation

use crate::config::{Settings, ENV_API_KEY, ENV_CACHE_ROOT, MAX_CONCURRENCY};
use crate::dates::{parse_date, read_dates_file};
use crate::downloader::{DateReport, DownloadError, DownloadSummary};
use crate::fetcher::nasa_config::StatusPolicy;
use crate::shutdown::SharedShutdown;
use crate::{ObservationDate, Rover};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info};

use super::{CliError, ListArgs, WarmArgs};

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Mars rover photo downloader CLI
#[derive(Parser, Debug)]
#[command(name = "mars-photo-downloader")]
#[command(about = "Download NASA Mars rover photos into a local cache", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Root directory of the photo cache
    #[arg(long, global = true, visible_alias = "output", env = ENV_CACHE_ROOT)]
    pub cache_root: Option<PathBuf>,

    /// NASA API key (falls back to DEMO_KEY)
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Photo downloads in flight per date (default: number of cores, max: 64)
    #[arg(long, global = true, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Treat non-success listing responses as errors instead of "no photos"
    ///
    /// Without this flag a rate-limited request (HTTP 429) looks exactly like a
    /// day without photos and gets recorded as such.
    #[arg(long, global = true, default_value_t = false)]
    pub strict_status: bool,

    /// Override the API base URL
    #[arg(long, global = true, hide = true, env = "MARS_PHOTOS_BASE_URL")]
    pub base_url: Option<String>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Settings described by the global flags
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            cache_root: self.cache_root.clone(),
            api_key: self.api_key.clone(),
            seed_dates_file: None,
            max_concurrency: self.concurrency.unwrap_or(defaults.max_concurrency),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            status_policy: if self.strict_status {
                StatusPolicy::Strict
            } else {
                StatusPolicy::TreatAsEmpty
            },
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download photos for one or more rovers and dates
    Download(DownloadArgs),

    /// Fill the cache for every rover from a seed dates file
    Warm(WarmArgs),

    /// List cached photos
    List(ListArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Rover to fetch (repeatable; default: Curiosity)
    #[arg(long = "rover")]
    pub rovers: Vec<Rover>,

    /// A single Earth date, in any common format
    #[arg(long)]
    pub date: Option<String>,

    /// File with one date per line
    #[arg(long)]
    pub dates: Option<PathBuf>,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl DownloadArgs {
    /// Rovers to fetch, in the order given, without repeats
    pub fn selected_rovers(&self) -> Vec<Rover> {
        if self.rovers.is_empty() {
            return vec![Rover::Curiosity];
        }
        let mut rovers = Vec::with_capacity(self.rovers.len());
        for rover in &self.rovers {
            if !rovers.contains(rover) {
                rovers.push(*rover);
            }
        }
        rovers
    }

    /// Dates requested through `--date` or `--dates`
    pub fn selected_dates(&self) -> Result<Vec<ObservationDate>, CliError> {
        match (&self.date, &self.dates) {
            (Some(_), Some(_)) | (None, None) => Err(CliError::InvalidArgument(
                "One of --date or --dates must have a value specified, but not both.".to_string(),
            )),
            (Some(date), None) => parse_date(date).map(|d| vec![d]).ok_or_else(|| {
                CliError::InvalidArgument(
                    "No value was provided for --date or the value is not a valid date."
                        .to_string(),
                )
            }),
            (None, Some(path)) => {
                let dates = read_dates_file(path)?;
                if dates.is_empty() {
                    return Err(CliError::InvalidArgument(format!(
                        "No valid dates found in '{}'",
                        path.display()
                    )));
                }
                Ok(dates)
            }
        }
    }

    /// Execute the download command. Stops at the first failing date.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let rovers = self.selected_rovers();
        let dates = self.selected_dates()?;

        let settings = cli.settings();
        let downloader = settings.build_downloader()?;

        info!(
            rovers = rovers.len(),
            dates = dates.len(),
            concurrency = downloader.max_concurrency(),
            cache_root = %downloader.cache().root().display(),
            "Starting photo download"
        );

        let progress = create_progress_bar((rovers.len() * dates.len()) as u64);
        let mut summary = DownloadSummary::default();
        let mut failure = None;

        'rovers: for &rover in &rovers {
            for &date in &dates {
                progress.set_message(format!("{rover} {date}"));
                match downloader.download_date(rover, date, &shutdown).await {
                    Ok(report) => {
                        summary.dates.push(report);
                        progress.inc(1);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break 'rovers;
                    }
                }
            }
        }
        progress.finish_and_clear();

        match cli.output_format {
            OutputFormat::Json => output_json(&summary, failure.as_ref())?,
            OutputFormat::Human => output_human(&summary, failure.as_ref()),
        }

        match failure {
            Some(e) => Err(CliError::DownloadError(e)),
            None => Ok(()),
        }
    }
}

/// Output result as JSON
fn output_json(summary: &DownloadSummary, failure: Option<&DownloadError>) -> Result<(), CliError> {
    let output = serde_json::json!({
        "success": failure.is_none(),
        "cancelled": failure.is_some_and(DownloadError::is_cancelled),
        "downloaded": summary.downloaded(),
        "skipped": summary.skipped(),
        "no_photo_dates": summary.no_photo_dates(),
        "dates": summary.dates,
        "error": failure.map(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn describe(report: &DateReport) -> String {
    if report.no_photos {
        format!("{} {}: no photos available", report.rover, report.date)
    } else {
        format!(
            "{} {}: {} downloaded, {} already cached",
            report.rover, report.date, report.downloaded, report.skipped
        )
    }
}

/// Output result in human-readable format
fn output_human(summary: &DownloadSummary, failure: Option<&DownloadError>) {
    for report in &summary.dates {
        println!("{}", describe(report));
    }

    match failure {
        None => {
            println!("\nDownload completed successfully!");
            println!("Photos downloaded: {}", summary.downloaded());
            println!("Photos already cached: {}", summary.skipped());
        }
        Some(e) if e.is_cancelled() => {
            eprintln!("\nDownload cancelled.");
        }
        Some(e) => {
            eprintln!("\nDownload failed!");
            eprintln!("Error: {e}");
            error!("Download failed: {}", e);
        }
    }
}

/// Create progress bar over rover/date pairs
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
