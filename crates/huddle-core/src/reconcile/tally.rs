//! Idempotent counters

use std::collections::HashSet;
use std::hash::Hash;

/// Counter backed by the set of ids it has counted.
///
/// `base` holds a server-side count whose ids are unknown locally (an unread
/// badge seeded from `count=exact`); ids inserted afterwards are added on top.
#[derive(Debug, Clone)]
pub struct IdTally<I> {
    base: usize,
    ids: HashSet<I>,
    removed: HashSet<I>,
}

impl<I: Eq + Hash + Clone> Default for IdTally<I> {
    fn default() -> Self {
        Self {
            base: 0,
            ids: HashSet::new(),
            removed: HashSet::new(),
        }
    }
}

impl<I: Eq + Hash + Clone> IdTally<I> {
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = I>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_count(base: usize) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.base + self.ids.len()
    }

    #[must_use]
    pub fn contains(&self, id: &I) -> bool {
        self.ids.contains(id)
    }

    /// Count `id` once. Returns whether the count changed.
    pub fn insert(&mut self, id: I) -> bool {
        if self.removed.contains(&id) {
            return false;
        }
        self.ids.insert(id)
    }

    /// Uncount `id`. Returns whether the count changed.
    pub fn remove(&mut self, id: &I) -> bool {
        self.removed.insert(id.clone());
        self.ids.remove(id)
    }

    /// Start over from an authoritative count. Ids counted so far are
    /// covered by it and will not be counted again.
    pub fn reset_to(&mut self, base: usize) {
        self.base = base;
        self.removed.extend(self.ids.drain());
    }

    /// Start over from an authoritative id set.
    pub fn reset_ids(&mut self, ids: impl IntoIterator<Item = I>) {
        self.base = 0;
        self.ids = ids.into_iter().collect();
        self.removed.retain(|id| !self.ids.contains(id));
    }
}
