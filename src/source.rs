use serde::{Deserialize, Serialize};

use crate::classifier::rank::Recommendation;
use crate::error::SourceError;

/// A classification target: a stable identifier plus a display name.
///
/// The name is what counts and exclusion rules are keyed by; the id lets a
/// host cross-reference folders across runs even when names repeat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

impl Folder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Folder { id: id.into(), name: name.into() }
    }
}

/// Membership snapshot and marker recorded on an item the last time the
/// engine touched it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordedState {
    /// Folder names the item belonged to when last processed.
    pub folders: Vec<String>,
    /// Set when recommendations were written and no learning has happened
    /// since; cleared once the item's filing has been learned.
    pub classified: bool,
}

/// One item (message) as the engine sees it, read from the host store and
/// written back to carry recommendations and bookkeeping state.
pub trait MailItem {
    /// All values of a named field, in order; empty when absent. Multi-value
    /// fields (addressee lists) return one entry per value.
    fn field_values(&self, field: &str) -> Vec<String>;

    /// Names of the folders the item currently belongs to.
    fn current_folders(&self) -> Result<Vec<String>, SourceError>;

    /// Items flagged deleted (in the trash) are left alone.
    fn is_deleted(&self) -> bool {
        false
    }

    /// The state recorded by the engine, or `None` if never processed.
    fn recorded_state(&self) -> Option<RecordedState>;

    /// Persist membership and marker for the next pass to compare against.
    fn set_recorded_state(&mut self, state: RecordedState) -> Result<(), SourceError>;

    /// Does the item already carry recommendations?
    fn has_recommendations(&self) -> bool;

    /// Write the ranked folder list back onto the item.
    fn set_recommendations(&mut self, ranked: &[Recommendation]) -> Result<(), SourceError>;
}

/// The host mail store, reduced to what the engine needs: enumerate folders
/// and iterate items. Listing order is up to the host.
pub trait MailSource {
    type Item: MailItem;

    /// Every folder in the store, excluded ones included; the engine
    /// filters by name itself.
    fn folders(&mut self) -> Result<Vec<Folder>, SourceError>;

    /// Items filed in one folder.
    fn items_in(&mut self, folder: &Folder) -> Result<Vec<Self::Item>, SourceError>;

    /// Every item in the store, for the reconciliation sweep.
    fn all_items(&mut self) -> Result<Vec<Self::Item>, SourceError>;
}

/// What reconciling one item did.
///
/// Per-item trouble is reported here instead of aborting the pass; the
/// orchestration logs skips and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Counts changed (learned and/or unlearned).
    Learned,
    /// Membership was recorded, no training signal taken.
    Recorded,
    /// Nothing to do.
    Unchanged,
    /// The item could not be processed; the pass continues.
    Skipped { reason: String },
}
