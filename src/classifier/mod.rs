pub mod extract;
pub mod pass;
pub mod rank;
pub mod snapshot;
pub mod stats;
pub mod store;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::classifier::extract::TermExtractor;
use crate::classifier::snapshot::ModelSnapshot;
use crate::classifier::stats::ModelStats;
use crate::classifier::store::FrequencyStore;
use crate::config::Config;
use crate::error::{EngineError, SourceError};
use crate::source::{Folder, ItemOutcome, MailItem, MailSource, RecordedState};

/// The learned model: the known folder list, the frequency store it was
/// learned into, and the statistics derived from both.
///
/// One owner for all of it, so the derived tables can only be replaced
/// wholesale (`rebuild_stats`) and classification reads them as a unit.
#[derive(Debug, Clone, Default)]
pub struct FolderModel {
    /// Known non-excluded folders, name to stable id.
    folders: IndexMap<String, String>,
    store: FrequencyStore,
    stats: ModelStats,
}

/// What a full rebuild processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub items: usize,
    pub skipped: usize,
}

impl FolderModel {
    pub fn new() -> Self {
        FolderModel::default()
    }

    pub fn store(&self) -> &FrequencyStore {
        &self.store
    }

    /// The statistics as last rebuilt. Check `stats_stale` before trusting
    /// them after learning.
    pub fn stats(&self) -> &ModelStats {
        &self.stats
    }

    /// True when the store changed since the last `rebuild_stats`.
    pub fn stats_stale(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    pub fn total_folders(&self) -> usize {
        self.folders.len()
    }

    /// Replace the known folder list with the non-excluded part of an
    /// enumeration.
    pub fn set_folders<'a, I>(&mut self, folders: I, config: &Config)
    where
        I: IntoIterator<Item = &'a Folder>,
    {
        self.folders = folders
            .into_iter()
            .filter(|f| !config.is_excluded_folder(&f.name))
            .map(|f| (f.name.clone(), f.id.clone()))
            .collect();
    }

    /// Does an observed folder enumeration differ from the known list?
    /// Compared by name set, the key everything else is filed under.
    pub fn folders_differ<'a, I>(&self, observed: I, config: &Config) -> bool
    where
        I: IntoIterator<Item = &'a Folder>,
    {
        let observed: BTreeSet<&str> = observed
            .into_iter()
            .filter(|f| !config.is_excluded_folder(&f.name))
            .map(|f| f.name.as_str())
            .collect();
        let known: BTreeSet<&str> = self.folders.keys().map(String::as_str).collect();
        observed != known
    }

    /// Reconcile one item's observed filing with what the model learned
    /// from it before. This is the learn/unlearn protocol:
    ///
    /// - never recorded: record the membership, learn nothing (the item is
    ///   presumed to still sit where it arrived);
    /// - marker set or membership changed: subtract the term vector from
    ///   the previously recorded non-excluded folders when the marker is
    ///   clear and the membership changed (a standing marker means these
    ///   counts were never learned, so there is nothing to undo), add it
    ///   into the current non-excluded folders, then clear the marker and
    ///   re-record the membership.
    ///
    /// Calling this twice without an external change in between mutates on
    /// the first call at most; the second is a no-op.
    pub fn reconcile<I: MailItem>(
        &mut self,
        item: &mut I,
        extractor: &TermExtractor<'_>,
        config: &Config,
    ) -> Result<ItemOutcome, SourceError> {
        if item.is_deleted() {
            return Ok(ItemOutcome::Unchanged);
        }

        let current = item.current_folders()?;
        let Some(recorded) = item.recorded_state() else {
            item.set_recorded_state(RecordedState { folders: current, classified: false })?;
            return Ok(ItemOutcome::Recorded);
        };

        let moved = as_set(&recorded.folders) != as_set(&current);
        if !recorded.classified && !moved {
            return Ok(ItemOutcome::Unchanged);
        }

        let terms = extractor.extract_item(item);
        let mut mutated = false;
        if !recorded.classified && moved {
            for folder in &recorded.folders {
                if !config.is_excluded_folder(folder) {
                    mutated |= self.store.subtract_counts(&terms, folder);
                }
            }
        }
        for folder in &current {
            if !config.is_excluded_folder(folder) {
                mutated |= self.store.add_counts(&terms, folder);
            }
        }

        item.set_recorded_state(RecordedState { folders: current, classified: false })?;
        Ok(if mutated { ItemOutcome::Learned } else { ItemOutcome::Recorded })
    }

    /// Ground-up rebuild: enumerate non-excluded folders, learn every item
    /// in each of them, derive statistics once at the end.
    ///
    /// The expensive path: O(items × extracted terms). Per-item failures
    /// are counted and skipped, not fatal.
    pub fn full_rebuild<S: MailSource>(
        &mut self,
        source: &mut S,
        config: &Config,
        extractor: &TermExtractor<'_>,
    ) -> Result<RebuildReport, EngineError> {
        let all = source.folders()?;
        self.set_folders(&all, config);
        self.store = FrequencyStore::new();

        let mut report = RebuildReport::default();
        for folder in all.iter().filter(|f| !config.is_excluded_folder(&f.name)) {
            let items = match source.items_in(folder) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(folder = %folder.name, error = %e, "folder skipped during rebuild");
                    report.skipped += 1;
                    continue;
                }
            };
            for item in items {
                if item.is_deleted() {
                    continue;
                }
                let terms = extractor.extract_item(&item);
                self.store.add_counts(&terms, &folder.name);
                report.items += 1;
            }
            debug!(folder = %folder.name, "folder counted");
        }

        self.rebuild_stats()?;
        Ok(report)
    }

    /// Derive IDF, TF-IDF and vector lengths from the current store. Full
    /// recompute by design; the tables are never patched in place.
    pub fn rebuild_stats(&mut self) -> Result<(), EngineError> {
        self.stats = ModelStats::compute(&self.store, self.folders.len())?;
        self.store.clear_dirty();
        Ok(())
    }

    /// Clone the model into its five-structure persistence form.
    pub fn to_snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            folders: self.folders.clone(),
            counts: self.store.clone(),
            idf: self.stats.idf_table().clone(),
            tfidf: self.stats.tfidf_table().clone(),
            vector_lengths: self.stats.vector_length_table().clone(),
        }
    }

    /// Restore a model from a loaded snapshot.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        FolderModel {
            folders: snapshot.folders,
            store: snapshot.counts,
            stats: ModelStats::from_parts(
                snapshot.idf,
                snapshot.tfidf,
                snapshot.vector_lengths,
            ),
        }
    }
}

fn as_set(folders: &[String]) -> BTreeSet<&str> {
    folders.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::extract::TermVector;

    /// Minimal in-memory item for driving the reconciliation protocol.
    struct StubItem {
        body: String,
        folders: Vec<String>,
        recorded: Option<RecordedState>,
        deleted: bool,
    }

    impl StubItem {
        fn new(body: &str, folders: &[&str]) -> Self {
            StubItem {
                body: body.to_string(),
                folders: folders.iter().map(|s| s.to_string()).collect(),
                recorded: None,
                deleted: false,
            }
        }
    }

    impl MailItem for StubItem {
        fn field_values(&self, field: &str) -> Vec<String> {
            if field == "Body" {
                vec![self.body.clone()]
            } else {
                Vec::new()
            }
        }

        fn current_folders(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.folders.clone())
        }

        fn is_deleted(&self) -> bool {
            self.deleted
        }

        fn recorded_state(&self) -> Option<RecordedState> {
            self.recorded.clone()
        }

        fn set_recorded_state(&mut self, state: RecordedState) -> Result<(), SourceError> {
            self.recorded = Some(state);
            Ok(())
        }

        fn has_recommendations(&self) -> bool {
            false
        }

        fn set_recommendations(
            &mut self,
            _ranked: &[crate::classifier::rank::Recommendation],
        ) -> Result<(), SourceError> {
            Ok(())
        }
    }

    fn reconcile(model: &mut FolderModel, config: &Config, item: &mut StubItem) -> ItemOutcome {
        let extractor = TermExtractor::new(config);
        model.reconcile(item, &extractor, config).unwrap()
    }

    #[test]
    fn first_sight_records_without_learning() {
        let config = Config::default();
        let mut model = FolderModel::new();
        let mut item = StubItem::new("quarterly budget numbers", &["Projects"]);

        let outcome = reconcile(&mut model, &config, &mut item);

        assert_eq!(outcome, ItemOutcome::Recorded);
        assert!(model.store().is_empty());
        let recorded = item.recorded.clone().unwrap();
        assert_eq!(recorded.folders, vec!["Projects"]);
        assert!(!recorded.classified);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let config = Config::default();
        let mut model = FolderModel::new();
        let mut item = StubItem::new("budget", &["Projects"]);
        item.recorded = Some(RecordedState {
            folders: vec!["Inbox".to_string()],
            classified: false,
        });

        let first = reconcile(&mut model, &config, &mut item);
        assert_eq!(first, ItemOutcome::Learned);
        assert_eq!(model.store().count("budget", "Projects"), 1.0);

        let second = reconcile(&mut model, &config, &mut item);
        assert_eq!(second, ItemOutcome::Unchanged);
        assert_eq!(model.store().count("budget", "Projects"), 1.0);
    }

    #[test]
    fn move_unlearns_the_old_folder_and_learns_the_new() {
        let config = Config::default();
        let mut model = FolderModel::new();

        // Another item's counts in A stay untouched by the move.
        let background: TermVector = [("budget", 5.0)].into_iter().collect();
        model.store.add_counts(&background, "A");

        // The item was learned into A earlier (marker clear), then moved.
        let mut item = StubItem::new("budget budget invoice", &["B"]);
        model.store.add_counts(
            &[("budget", 2.0), ("invoice", 1.0)].into_iter().collect(),
            "A",
        );
        item.recorded = Some(RecordedState { folders: vec!["A".to_string()], classified: false });

        let outcome = reconcile(&mut model, &config, &mut item);

        assert_eq!(outcome, ItemOutcome::Learned);
        // A is back to the background counts, B holds the item's counts.
        assert_eq!(model.store().count("budget", "A"), 5.0);
        assert_eq!(model.store().count("invoice", "A"), 0.0);
        assert_eq!(model.store().count("budget", "B"), 2.0);
        assert_eq!(model.store().count("invoice", "B"), 1.0);
        assert_eq!(item.recorded.clone().unwrap().folders, vec!["B"]);
    }

    #[test]
    fn standing_marker_learns_without_unlearning() {
        // A classified item was never a training signal, so refiling it
        // must not subtract from the recorded folders.
        let config = Config::default();
        let mut model = FolderModel::new();
        let background: TermVector = [("budget", 3.0)].into_iter().collect();
        model.store.add_counts(&background, "A");

        let mut item = StubItem::new("budget", &["B"]);
        item.recorded = Some(RecordedState { folders: vec!["A".to_string()], classified: true });

        let outcome = reconcile(&mut model, &config, &mut item);

        assert_eq!(outcome, ItemOutcome::Learned);
        assert_eq!(model.store().count("budget", "A"), 3.0);
        assert_eq!(model.store().count("budget", "B"), 1.0);
        assert!(!item.recorded.clone().unwrap().classified);
    }

    #[test]
    fn excluded_folders_contribute_no_counts() {
        let mut config = Config::default();
        config.excluded_folders = vec!["Spam".to_string()];
        let mut model = FolderModel::new();

        let mut item = StubItem::new("budget", &["($Inbox)", "Spam"]);
        item.recorded =
            Some(RecordedState { folders: vec!["Elsewhere".to_string()], classified: true });

        let outcome = reconcile(&mut model, &config, &mut item);

        // The membership is recorded, but nothing was learnable.
        assert_eq!(outcome, ItemOutcome::Recorded);
        assert!(model.store().is_empty());
    }

    #[test]
    fn deleted_items_are_left_alone() {
        let config = Config::default();
        let mut model = FolderModel::new();
        let mut item = StubItem::new("budget", &["Projects"]);
        item.deleted = true;

        let outcome = reconcile(&mut model, &config, &mut item);
        assert_eq!(outcome, ItemOutcome::Unchanged);
        assert!(item.recorded.is_none());
    }

    #[test]
    fn membership_reorder_is_not_a_move() {
        let config = Config::default();
        let mut model = FolderModel::new();
        let mut item = StubItem::new("budget", &["B", "A"]);
        item.recorded = Some(RecordedState {
            folders: vec!["A".to_string(), "B".to_string()],
            classified: false,
        });

        let outcome = reconcile(&mut model, &config, &mut item);
        assert_eq!(outcome, ItemOutcome::Unchanged);
        assert!(model.store().is_empty());
    }

    #[test]
    fn snapshot_round_trip_preserves_the_model() {
        let config = Config::default();
        let mut model = FolderModel::new();
        model.set_folders(
            &[Folder::new("f1", "Projects"), Folder::new("f2", "Personal")],
            &config,
        );
        model.store.add_counts(&[("budget", 2.0)].into_iter().collect(), "Projects");
        model.store.add_counts(&[("vacation", 4.0)].into_iter().collect(), "Personal");
        model.rebuild_stats().unwrap();

        let restored = FolderModel::from_snapshot(model.to_snapshot());

        assert_eq!(restored.store(), model.store());
        assert_eq!(restored.stats(), model.stats());
        assert_eq!(restored.total_folders(), 2);
        assert!(!restored.stats_stale());
    }

    #[test]
    fn folder_diff_detects_additions_and_removals() {
        let config = Config::default();
        let mut model = FolderModel::new();
        model.set_folders(
            &[Folder::new("f1", "Projects"), Folder::new("f2", "Personal")],
            &config,
        );

        let same = [
            Folder::new("f1", "Projects"),
            Folder::new("f2", "Personal"),
            Folder::new("x", "($Hidden)"),
        ];
        assert!(!model.folders_differ(&same, &config));

        let added = [
            Folder::new("f1", "Projects"),
            Folder::new("f2", "Personal"),
            Folder::new("f3", "Travel"),
        ];
        assert!(model.folders_differ(&added, &config));

        let removed = [Folder::new("f1", "Projects")];
        assert!(model.folders_differ(&removed, &config));
    }
}
