/// This crate is an incremental vector-space engine that recommends filing
/// folders for mail-like items.
///
/// It learns which vocabulary correlates with which folder from items the
/// user has already filed, keeps the counts consistent as items move
/// between folders, and ranks candidate folders for new items with a
/// TF-IDF similarity score.
pub mod classifier;
pub mod config;
pub mod error;
pub mod source;

/// Pass Engine
/// The top-level type of this crate. One engine owns the configuration and
/// the learned model and drives complete classify-and-learn passes against
/// a mail source:
/// - load the persisted model (or rebuild it from scratch),
/// - write top-3 folder recommendations into the classify folders,
/// - reconcile every item's observed filing with the model (learn/unlearn),
/// - recompute the statistics and persist a fresh snapshot when anything
///   material changed.
///
/// Passes are strictly sequential; an overlapping trigger is skipped, never
/// run in parallel.
pub use classifier::pass::{Engine, PassOutcome, PassSummary};

/// Folder Model
/// The learned state: the known folder list, the sparse term/folder
/// frequency store and the derived statistics. The statistics are never
/// patched incrementally; any learning or folder-set change marks them
/// stale and they are recomputed from the store in one shot.
pub use classifier::FolderModel;

/// Frequency Store
/// Sparse `term -> (folder -> raw count)` accounting with the learn/unlearn
/// delta protocol. Counts that reach zero are deleted, so document
/// frequency is always the width of a term's row.
pub use classifier::store::FrequencyStore;

/// Derived Statistics
/// The IDF, TF-IDF and vector-length tables classification reads as one
/// immutable snapshot.
pub use classifier::stats::ModelStats;

/// Term Extraction
/// Normalizes raw field text into a per-item term vector: whitespace
/// tokenization, lower-casing, edge stripping of non-word characters,
/// length and stopword filtering.
pub use classifier::extract::{RawField, TermExtractor, TermVector};

/// Classification
/// Scores an item's term vector against every folder and keeps the best
/// three. The similarity is the `dot / item_length * folder_length`
/// formula; see `classify` for why it is not true cosine similarity.
pub use classifier::rank::{classify, Recommendation};

/// Model Persistence
/// The five-structure snapshot (folder list, counts, IDF, TF-IDF, vector
/// lengths) written and restored as a matched set, and the file-backed
/// store that saves it atomically (temp file, then rename).
pub use classifier::snapshot::{FsModelStore, LoadError, ModelSnapshot, ModelStore};

/// Collaborator Interfaces
/// What the engine needs from the host mail store: folder enumeration, item
/// iteration, field access, and the per-item bookkeeping state
/// (recorded membership, classified marker, recommendations).
pub use source::{Folder, ItemOutcome, MailItem, MailSource, RecordedState};

/// Configuration
/// Default language and stopword lists, the field sets to extract, folder
/// exclusions and the hidden-folder policy, classify targets, and the model
/// path. Read-only input to the engine.
pub use config::Config;

/// Errors
pub use error::{EngineError, SourceError};
