//! Last-modified lookup for conditional GET
//!
//! The status engine never asks the filesystem when a resource changed; it
//! asks a [`FreshnessTable`] handed to it at construction.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `Thu, 18 Mar 2021 20:44:30 GMT`
const DEMO_LAST_MODIFIED_SECS: u64 = 1_616_100_270;

/// Read-only lookup from resource path to its last-modified time
pub trait FreshnessTable: Send + Sync {
    /// Last-modified time of `path` (leading `/` optional), if known
    fn last_modified(&self, path: &str) -> Option<SystemTime>;
}

impl<F> FreshnessTable for F
where
    F: Fn(&str) -> Option<SystemTime> + Send + Sync,
{
    fn last_modified(&self, path: &str) -> Option<SystemTime> {
        self(path)
    }
}

/// Fixed table of resource names and timestamps
#[derive(Debug, Clone, Default)]
pub struct StaticFreshnessTable {
    entries: HashMap<String, SystemTime>,
}

impl StaticFreshnessTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The table the server ships with: `index.html` and `sea.html`, both
    /// last modified on `Thu, 18 Mar 2021 20:44:30 GMT`
    pub fn demo() -> Self {
        let stamp = UNIX_EPOCH + Duration::from_secs(DEMO_LAST_MODIFIED_SECS);
        Self::new()
            .with("index.html", stamp)
            .with("sea.html", stamp)
    }

    /// Add an entry
    pub fn with(mut self, name: impl AsRef<str>, last_modified: SystemTime) -> Self {
        self.insert(name, last_modified);
        self
    }

    /// Add an entry in place
    pub fn insert(&mut self, name: impl AsRef<str>, last_modified: SystemTime) {
        self.entries
            .insert(normalize(name.as_ref()).to_string(), last_modified);
    }
}

impl FreshnessTable for StaticFreshnessTable {
    fn last_modified(&self, path: &str) -> Option<SystemTime> {
        self.entries.get(normalize(path)).copied()
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::date::format_http_date;

    #[test]
    fn test_demo_table() {
        let table = StaticFreshnessTable::demo();
        let stamp = table.last_modified("/index.html").unwrap();

        assert_eq!(format_http_date(stamp), "Thu, 18 Mar 2021 20:44:30 GMT");
        assert_eq!(table.last_modified("sea.html"), Some(stamp));
        assert_eq!(table.last_modified("/other.html"), None);
    }

    #[test]
    fn test_closure_table() {
        let table = |path: &str| (path == "/a.html").then_some(UNIX_EPOCH);
        assert_eq!(table.last_modified("/a.html"), Some(UNIX_EPOCH));
        assert_eq!(table.last_modified("/b.html"), None);
    }
}
