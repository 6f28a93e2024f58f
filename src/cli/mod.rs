//! CLI command implementations

pub mod download;
pub mod error;
pub mod list;
pub mod warm;

pub use download::{Cli, Commands, DownloadArgs, OutputFormat};
pub use error::CliError;
pub use list::ListArgs;
pub use warm::WarmArgs;
