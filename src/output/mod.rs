//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Accumulating statistics over the result stream
//! - Printing a statistics summary to stdout
//! - Writing a markdown report of a finished crawl

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report, CrawlReport};
pub use stats::{print_statistics, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
