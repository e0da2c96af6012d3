//! Markdown report generation
//!
//! This module renders a finished crawl as a human-readable markdown file:
//! run information, statistics, and one section per processed page with
//! its summary or error.

use crate::crawler::CrawlResult;
use crate::output::stats::CrawlStatistics;
use crate::output::{OutputError, OutputResult};
use std::fs;
use std::path::Path;

/// Longest content excerpt shown for a page without a summary
const EXCERPT_CHARS: usize = 300;

/// Everything that goes into a report
#[derive(Debug, Clone, Copy)]
pub struct CrawlReport<'a> {
    pub seed: &'a str,
    pub config_hash: Option<&'a str>,
    pub stats: &'a CrawlStatistics,
    pub results: &'a [CrawlResult],
}

/// Writes the report to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the file
pub fn write_markdown_report(report: &CrawlReport<'_>, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    fs::write(output_path, markdown).map_err(|source| OutputError::Write {
        path: output_path.display().to_string(),
        source,
    })?;

    tracing::info!("Wrote crawl report to {}", output_path.display());
    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport<'_>) -> String {
    let stats = report.stats;
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed));
    md.push_str(&format!("- **Started**: {}\n", stats.started_at.to_rfc3339()));
    if let Some(finished) = stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = stats.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    if let Some(hash) = report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Processed**: {}\n", stats.total_results));
    md.push_str(&format!("- **Succeeded**: {}\n", stats.succeeded));
    md.push_str(&format!("- **Summarized**: {}\n", stats.summarized));
    md.push_str(&format!("- **Unique Domains**: {}\n", stats.domains.len()));
    md.push_str(&format!("- **Total Links**: {}\n", stats.total_links));
    md.push_str(&format!("- **Total Errors**: {}\n", stats.total_errors()));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    if !stats.pages_by_depth.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &stats.pages_by_depth {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !stats.errors_by_kind.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Type | Count |\n");
        md.push_str("|------------|-------|\n");
        for (kind, count) in &stats.errors_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !report.results.is_empty() {
        md.push_str("## Pages\n\n");
        for result in report.results {
            format_result(&mut md, result);
        }
    }

    md
}

fn format_result(md: &mut String, result: &CrawlResult) {
    md.push_str(&format!("### {}\n\n", result.location));
    md.push_str(&format!("- **Depth**: {}\n", result.depth));
    if let Some(final_location) = &result.final_location {
        if final_location != &result.location {
            md.push_str(&format!("- **Redirected To**: {}\n", final_location));
        }
    }
    md.push_str(&format!("- **Fetched**: {}\n", result.fetched_at.to_rfc3339()));
    md.push_str(&format!("- **Links**: {}\n\n", result.links.len()));

    if let Some(error) = &result.error {
        md.push_str(&format!("**Error** ({}): {}\n\n", error.kind, error.message));
    } else if !result.summary.is_empty() {
        md.push_str(result.summary.trim());
        md.push_str("\n\n");
    } else if !result.content.is_empty() {
        let excerpt: String = result.content.chars().take(EXCERPT_CHARS).collect();
        md.push_str(&format!("> {}", excerpt));
        if result.content.chars().count() > EXCERPT_CHARS {
            md.push_str("...");
        }
        md.push_str("\n\n");
    }
}
