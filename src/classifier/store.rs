use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::extract::TermVector;

/// Sparse two-level map `term -> (folder name -> raw count)`.
///
/// The single source of truth the statistics derive from. Counts are
/// positive: a delta that drives a (term, folder) entry to zero or below
/// deletes the entry, and a term with no folders left is deleted outright,
/// so document frequency can always be read as the row width.
///
/// Any mutation leaves the store dirty, meaning derived statistics are
/// stale and must be fully recomputed before the next classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrequencyStore {
    counts: IndexMap<String, IndexMap<String, f64>>,
    #[serde(skip)]
    dirty: bool,
}

impl FrequencyStore {
    pub fn new() -> Self {
        FrequencyStore::default()
    }

    /// Add an item's term counts into `folder`. Returns whether anything
    /// changed (an empty delta is a no-op).
    pub fn add_counts(&mut self, terms: &TermVector, folder: &str) -> bool {
        for (term, count) in terms.iter() {
            let row = self.counts.entry(term.to_string()).or_default();
            *row.entry(folder.to_string()).or_insert(0.0) += count;
        }
        if terms.is_empty() {
            return false;
        }
        self.dirty = true;
        true
    }

    /// Subtract an item's term counts from `folder`, deleting entries that
    /// reach zero and terms that lose their last folder. Entries that were
    /// never counted are ignored. Returns whether anything changed.
    pub fn subtract_counts(&mut self, terms: &TermVector, folder: &str) -> bool {
        let mut changed = false;
        for (term, count) in terms.iter() {
            let Some(row) = self.counts.get_mut(term) else {
                continue;
            };
            if let Some(current) = row.get(folder).copied() {
                let remaining = current - count;
                if remaining > 0.0 {
                    row.insert(folder.to_string(), remaining);
                } else {
                    row.shift_remove(folder);
                }
                if row.is_empty() {
                    self.counts.shift_remove(term);
                }
                changed = true;
            }
        }
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Raw count for a (term, folder) pair; 0 when absent.
    pub fn count(&self, term: &str, folder: &str) -> f64 {
        self.counts
            .get(term)
            .and_then(|row| row.get(folder))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of folders with a nonzero entry for `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.counts.get(term).map_or(0, |row| row.len())
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    /// Iterate rows as `(term, folder -> count)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, f64>)> {
        self.counts.iter().map(|(term, row)| (term.as_str(), row))
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Stale-statistics latch.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Equality is over the counts; the dirty latch is bookkeeping.
impl PartialEq for FrequencyStore {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}
