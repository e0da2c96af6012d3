//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, link resolution, host extraction
//! and the allowed-host filter.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::is_allowed_host;
pub use normalize::{normalize, normalize_url, resolve_link};
