//! Statistics accumulated over a crawl's result stream
//!
//! This module provides functionality for tallying results as they arrive
//! and displaying the totals once the crawl is done.

use crate::crawler::{CrawlResult, ErrorKind};
use crate::url::extract_domain;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of results received
    pub total_results: u64,

    /// Results without a job error
    pub succeeded: u64,

    /// Successful results that also carry a summary
    pub summarized: u64,

    /// Failed results by error kind
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,

    /// Results per depth
    pub pages_by_depth: BTreeMap<u32, u64>,

    /// Total number of links found across all pages
    pub total_links: u64,

    /// Distinct hosts among fetched locations
    pub domains: HashSet<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            total_results: 0,
            succeeded: 0,
            summarized: 0,
            errors_by_kind: BTreeMap::new(),
            pages_by_depth: BTreeMap::new(),
            total_links: 0,
            domains: HashSet::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Folds one result into the totals
    pub fn record(&mut self, result: &CrawlResult) {
        self.total_results += 1;
        *self.pages_by_depth.entry(result.depth).or_insert(0) += 1;
        self.total_links += result.links.len() as u64;

        let fetched = result.final_location.as_ref().unwrap_or(&result.location);
        if let Some(domain) = extract_domain(fetched) {
            self.domains.insert(domain);
        }

        match &result.error {
            None => {
                self.succeeded += 1;
                if !result.summary.is_empty() {
                    self.summarized += 1;
                }
            }
            Some(error) => *self.errors_by_kind.entry(error.kind).or_insert(0) += 1,
        }
    }

    /// Marks the end of the crawl
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_errors(&self) -> u64 {
        self.errors_by_kind.values().sum()
    }

    /// Deepest level that produced a result
    pub fn max_depth_reached(&self) -> Option<u32> {
        self.pages_by_depth.keys().next_back().copied()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Percentage of results without a job error
    pub fn success_rate(&self) -> f64 {
        if self.total_results == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total_results as f64) * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages processed: {}", stats.total_results);
    println!("  Unique domains: {}", stats.domains.len());
    println!("  Total links found: {}", stats.total_links);
    println!("  Summaries generated: {}", stats.summarized);
    if let Some(depth) = stats.max_depth_reached() {
        println!("  Deepest level reached: {}", depth);
    }
    if let Some(duration) = stats.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!();

    if !stats.pages_by_depth.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.pages_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        stats.success_rate(),
        stats.succeeded,
        stats.total_results
    );
}
