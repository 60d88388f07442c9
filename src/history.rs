//! Append-only versioned record sets.
//!
//! Records are keyed by `(entity_id, version)`. A new version supersedes the
//! previous one; nothing is ever overwritten or removed.

use std::collections::BTreeMap;

/// Versioned history of one entity kind.
#[derive(Debug, Clone)]
pub struct History<T> {
    records: BTreeMap<(u64, u32), T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T> History<T> {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new version for `entity_id` and returns its version number
    /// (1 for the first record).
    pub fn append(&mut self, entity_id: u64, record: T) -> u32 {
        let version = self.latest_version(entity_id).map_or(1, |v| v + 1);
        self.records.insert((entity_id, version), record);
        version
    }

    /// Highest version recorded for `entity_id`.
    pub fn latest_version(&self, entity_id: u64) -> Option<u32> {
        self.records
            .range((entity_id, 0)..=(entity_id, u32::MAX))
            .next_back()
            .map(|((_, v), _)| *v)
    }

    /// Current record for `entity_id`.
    pub fn latest(&self, entity_id: u64) -> Option<&T> {
        self.records
            .range((entity_id, 0)..=(entity_id, u32::MAX))
            .next_back()
            .map(|(_, r)| r)
    }

    /// A specific version.
    pub fn version(&self, entity_id: u64, version: u32) -> Option<&T> {
        self.records.get(&(entity_id, version))
    }

    /// All versions of `entity_id`, oldest first.
    pub fn versions(&self, entity_id: u64) -> Vec<&T> {
        self.records
            .range((entity_id, 0)..=(entity_id, u32::MAX))
            .map(|(_, r)| r)
            .collect()
    }

    /// Latest record of every entity, in entity id order.
    pub fn latest_all(&self) -> Vec<(u64, &T)> {
        let mut out: Vec<(u64, &T)> = Vec::new();
        for ((id, _), record) in &self.records {
            match out.last_mut() {
                Some(last) if last.0 == *id => last.1 = record,
                _ => out.push((*id, record)),
            }
        }
        out
    }

    /// Number of distinct entities.
    pub fn entity_count(&self) -> usize {
        self.latest_all().len()
    }

    /// Total number of records across all versions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
