//! Subdomain → backend routing table.
//!
//! # Responsibilities
//! - Point lookup of a subdomain's backend target
//! - Whole-table replacement from a freshly fetched mapping
//!
//! # Design Decisions
//! - Snapshots are immutable `HashMap`s behind an `ArcSwap`
//! - Readers never lock; a lookup sees exactly one snapshot
//! - No per-key mutation exists

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Decoded domain-source payload: ordered `(subdomain, backend_url)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainMapping {
    entries: Vec<(String, String)>,
}

impl DomainMapping {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Collapse into a lookup map. A repeated subdomain keeps its last
    /// occurrence; the number of overwritten entries is returned alongside.
    pub fn into_snapshot(self) -> (HashMap<String, String>, usize) {
        let mut snapshot = HashMap::with_capacity(self.entries.len());
        let mut duplicates = 0;
        for (subdomain, target) in self.entries {
            if snapshot.insert(subdomain, target).is_some() {
                duplicates += 1;
            }
        }
        (snapshot, duplicates)
    }
}

impl FromIterator<(String, String)> for DomainMapping {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Concurrency-safe, read-mostly routing table.
///
/// Shared via `Arc` between the dispatcher (readers) and the refresher
/// (the single writer).
#[derive(Debug, Default)]
pub struct RoutingTable {
    snapshot: ArcSwap<HashMap<String, String>>,
}

impl RoutingTable {
    /// Create an empty table. Every lookup misses until the first replace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the backend target for `subdomain`.
    pub fn lookup(&self, subdomain: &str) -> Option<String> {
        self.snapshot.load().get(subdomain).cloned()
    }

    /// Install a new snapshot built from `mapping`, discarding the old one.
    ///
    /// Returns the number of duplicate subdomains that were collapsed.
    pub fn replace(&self, mapping: DomainMapping) -> usize {
        let (snapshot, duplicates) = mapping.into_snapshot();
        self.snapshot.store(Arc::new(snapshot));
        duplicates
    }

    /// The current snapshot as a whole.
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.snapshot.load_full()
    }

    /// Number of entries in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
