//! CLI command for listing cached photos

use crate::cache::{PhotoCatalog, PhotoPage};
use crate::dates::parse_date;
use crate::Rover;
use clap::Args;

use super::{Cli, CliError, OutputFormat};

/// List command arguments
///
/// Scope narrows with `--rover` and/or `--date`; without either the whole
/// cache is listed.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only photos from this rover
    #[arg(long)]
    pub rover: Option<Rover>,

    /// Only photos from this Earth date, in any common format
    #[arg(long)]
    pub date: Option<String>,

    /// Page index (zero-based) when paging
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Page size; omit to list everything in scope
    #[arg(long)]
    pub take: Option<usize>,
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let cache = cli.settings().open_cache()?;
        let catalog = PhotoCatalog::new(&cache);

        let date = match &self.date {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| {
                CliError::InvalidArgument(format!("'{raw}' is not a valid date"))
            })?),
            None => None,
        };

        let page = match (self.rover, date, self.take) {
            (None, None, Some(take)) => catalog.browse(self.skip, take)?,
            (rover, date, take) => {
                let photos = match (rover, date) {
                    (Some(rover), Some(date)) => catalog.for_rover_on_date(rover, date)?,
                    (Some(rover), None) => catalog.for_rover(rover)?,
                    (None, Some(date)) => catalog.on_date(date)?,
                    (None, None) => catalog.all()?,
                };
                let take = take.unwrap_or(photos.len());
                PhotoPage::slice(photos, self.skip, take)
            }
        };

        match cli.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
            OutputFormat::Human => output_human(&page),
        }
        Ok(())
    }
}

fn output_human(page: &PhotoPage) {
    for photo in &page.photos {
        println!(
            "{} | {} | {} | {}",
            photo.rover,
            photo.date,
            photo.filename,
            photo.path.display()
        );
    }
    println!(
        "\nShowing {} of {} cached photo(s)",
        page.photos.len(),
        page.total
    );
}
