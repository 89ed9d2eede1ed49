use crate::catalog::{Origin, ResourceEntry};
use skpack_schema::ResourcePath;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Exactly one entry per relative path.
#[derive(Debug, Clone, Default)]
pub struct MergedFileSet {
    entries: BTreeMap<ResourcePath, ResourceEntry>,
    /// Base paths that an override replaced.
    replaced: BTreeSet<ResourcePath>,
}

impl MergedFileSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ResourceEntry> {
        let key = ResourcePath::parse(path).ok()?;
        self.entries.get(&key)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ResourcePath> {
        self.entries.keys()
    }

    pub fn replaced(&self) -> impl Iterator<Item = &ResourcePath> {
        self.replaced.iter()
    }

    /// Insert, replacing any entry with the same path. Returns the displaced entry.
    fn insert(&mut self, entry: ResourceEntry) -> Option<ResourceEntry> {
        match self.entries.entry(entry.path.clone()) {
            Entry::Occupied(mut slot) => Some(slot.insert(entry)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                None
            }
        }
    }
}

/// Combine base and override entries; an override replaces a base entry with
/// the same relative path wholesale.
pub fn merge(base: Vec<ResourceEntry>, overrides: Vec<ResourceEntry>) -> MergedFileSet {
    let mut set = MergedFileSet::default();
    for entry in base {
        set.insert(entry);
    }
    for entry in overrides {
        let path = entry.path.clone();
        if let Some(previous) = set.insert(entry) {
            debug!("override {path} replaces {}", previous.source.describe());
            if previous.origin == Origin::Base {
                set.replaced.insert(path);
            }
        }
    }
    set
}
