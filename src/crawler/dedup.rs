//! Visited-set for a single crawl

use dashmap::DashSet;
use url::Url;

/// Tracks every normalized location admitted to the frontier
///
/// `admit` is a single check-and-insert on a sharded concurrent set, so two
/// workers racing on the same link can never both win. There is no removal;
/// the store lives exactly as long as the crawl that owns it.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: DashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `location` and returns true if it had not been seen before
    ///
    /// Callers must pass an already normalized URL.
    pub fn admit(&self, location: &Url) -> bool {
        self.seen.insert(location.as_str().to_owned())
    }

    pub fn contains(&self, location: &Url) -> bool {
        self.seen.contains(location.as_str())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
