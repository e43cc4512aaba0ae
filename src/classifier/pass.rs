use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::classifier::extract::TermExtractor;
use crate::classifier::rank::classify;
use crate::classifier::snapshot::{LoadError, ModelStore};
use crate::classifier::FolderModel;
use crate::config::Config;
use crate::error::EngineError;
use crate::source::{ItemOutcome, MailItem, MailSource, RecordedState};

/// Counters for one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// The model was rebuilt from scratch (missing or unreadable snapshot).
    pub rebuilt: bool,
    /// Items that received recommendations.
    pub classified: usize,
    /// Items whose counts were learned or unlearned.
    pub learned: usize,
    /// Items whose membership was recorded without a training signal.
    pub recorded: usize,
    /// Items (or folders) skipped over a per-item failure.
    pub skipped: usize,
    /// The folder set changed since the last pass.
    pub folders_changed: bool,
    /// Statistics were recomputed this pass.
    pub stats_refreshed: bool,
    /// A snapshot was persisted this pass.
    pub saved: bool,
}

/// Result of asking for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// Another pass was already running; this one was skipped, not queued.
    SkippedBusy,
}

/// Drives complete classify-and-learn passes over a mail source.
///
/// One pass: make sure a model is in memory (load the snapshot, or rebuild
/// from scratch), write recommendations into the configured classify
/// folders, reconcile every item's filing with the model, and when anything
/// was learned or the folder set changed, recompute statistics and persist
/// a fresh snapshot.
///
/// The engine is single-writer by design: callers must not run passes
/// concurrently. The internal run latch makes an overlapping trigger skip
/// cleanly instead of interleaving, but serialization is the host's job.
pub struct Engine {
    config: Config,
    model: FolderModel,
    model_loaded: bool,
    in_pass: AtomicBool,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Engine {
            config,
            model: FolderModel::new(),
            model_loaded: false,
            in_pass: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &FolderModel {
        &self.model
    }

    /// Run one pass to completion.
    ///
    /// On a hard failure the in-memory model is discarded; the next pass
    /// starts over from the last persisted snapshot (or a rebuild), so a
    /// half-updated model can never leak into later classifications.
    pub fn run_pass<S, M>(
        &mut self,
        source: &mut S,
        models: &M,
    ) -> Result<PassOutcome, EngineError>
    where
        S: MailSource,
        M: ModelStore,
    {
        if self.in_pass.swap(true, Ordering::Acquire) {
            debug!("pass already in progress, skipping");
            return Ok(PassOutcome::SkippedBusy);
        }
        let result = self.pass_body(source, models);
        self.in_pass.store(false, Ordering::Release);

        match result {
            Ok(summary) => Ok(PassOutcome::Completed(summary)),
            Err(e) => {
                self.model = FolderModel::new();
                self.model_loaded = false;
                Err(e)
            }
        }
    }

    fn pass_body<S, M>(&mut self, source: &mut S, models: &M) -> Result<PassSummary, EngineError>
    where
        S: MailSource,
        M: ModelStore,
    {
        let config = &self.config;
        let model = &mut self.model;
        let model_loaded = &mut self.model_loaded;
        let extractor = TermExtractor::new(config);
        let mut summary = PassSummary::default();

        // A model must be in memory before anything else. Loading is slow
        // enough to be worth the latch; a missing or unreadable snapshot
        // means starting over.
        if !*model_loaded {
            let rebuild = match models.load() {
                Ok(snapshot) => {
                    *model = FolderModel::from_snapshot(snapshot);
                    info!(
                        folders = model.total_folders(),
                        terms = model.store().len(),
                        "model snapshot loaded"
                    );
                    false
                }
                Err(LoadError::NotFound) => {
                    info!("no persisted model, rebuilding from scratch");
                    true
                }
                Err(LoadError::Corrupt(reason)) => {
                    warn!(%reason, "persisted model unreadable, rebuilding from scratch");
                    true
                }
            };
            *model_loaded = true;
            if rebuild {
                let report = model.full_rebuild(source, config, &extractor)?;
                info!(items = report.items, "vector model rebuilt");
                summary.rebuilt = true;
                summary.skipped += report.skipped;
                summary.stats_refreshed = true;
                summary.saved = save_snapshot(model, models, model_loaded);
            }
        }

        // Recommend folders for items sitting in the classify targets that
        // do not carry recommendations yet.
        let known_folders =
            if config.classify_folders.is_empty() { Vec::new() } else { source.folders()? };
        for target in &config.classify_folders {
            let Some(folder) = known_folders.iter().find(|f| f.name == *target) else {
                warn!(folder = %target, "classify folder not found");
                continue;
            };
            let items = match source.items_in(folder) {
                Ok(items) => items,
                Err(e) => {
                    warn!(folder = %target, error = %e, "classify folder skipped");
                    summary.skipped += 1;
                    continue;
                }
            };
            for mut item in items {
                if item.is_deleted() || item.has_recommendations() {
                    continue;
                }
                let terms = extractor.extract_item(&item);
                let ranked = classify(&terms, model.stats());
                if ranked.is_empty() {
                    warn!(folder = %target, "no recommended folders; is the model empty?");
                }
                let classified = !ranked.is_empty();
                let written = (|| {
                    if classified {
                        item.set_recommendations(&ranked)?;
                    }
                    let current = item.current_folders()?;
                    item.set_recorded_state(RecordedState { folders: current, classified })
                })();
                match written {
                    Ok(()) if classified => summary.classified += 1,
                    Ok(()) => {}
                    Err(e) => {
                        warn!(error = %e, "item skipped during classification");
                        summary.skipped += 1;
                    }
                }
            }
        }

        // Learn from everything that was filed or refiled since last time.
        let mut learned = false;
        for mut item in source.all_items()? {
            let outcome = match model.reconcile(&mut item, &extractor, config) {
                Ok(outcome) => outcome,
                Err(e) => ItemOutcome::Skipped { reason: e.to_string() },
            };
            match outcome {
                ItemOutcome::Learned => {
                    learned = true;
                    summary.learned += 1;
                }
                ItemOutcome::Recorded => summary.recorded += 1,
                ItemOutcome::Unchanged => {}
                ItemOutcome::Skipped { reason } => {
                    warn!(%reason, "item skipped during reconciliation");
                    summary.skipped += 1;
                }
            }
        }

        // Folder create/delete outside the engine also invalidates the
        // statistics; only worth checking when nothing else already did.
        if !learned {
            let observed = source.folders()?;
            if model.folders_differ(&observed, config) {
                info!("folder set changed since the last pass");
                summary.folders_changed = true;
                model.set_folders(&observed, config);
            }
        }

        if learned || summary.folders_changed {
            model.rebuild_stats()?;
            summary.stats_refreshed = true;
            summary.saved = save_snapshot(model, models, model_loaded);
        }

        debug!(?summary, "pass complete");
        Ok(summary)
    }
}

/// Persist the model. A failed save keeps the previous on-disk snapshot
/// authoritative (writes are temp-then-rename) and clears the loaded latch
/// so the next pass reloads or rebuilds instead of trusting memory.
fn save_snapshot<M: ModelStore>(
    model: &FolderModel,
    models: &M,
    model_loaded: &mut bool,
) -> bool {
    match models.save(&model.to_snapshot()) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "model snapshot save failed");
            *model_loaded = false;
            false
        }
    }
}
