use std::io;

/// Errors surfaced by the engine.
///
/// Per-item trouble during a pass is not an error: it becomes a
/// skipped-with-reason outcome and the pass continues. This enum covers the
/// failures that end a pass (or a load/save attempt) as a whole.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The mail source (folder enumeration, item listing) failed.
    #[error("mail source error: {0}")]
    Source(#[from] SourceError),

    /// Reading or writing the persisted model failed at the I/O level.
    #[error("model persistence failed: {0}")]
    Persist(#[source] io::Error),

    /// The persisted model could not be decoded as a matched set.
    #[error("model snapshot corrupt: {0}")]
    Corrupt(#[source] serde_cbor::Error),

    /// An internal invariant of the statistics computation was violated.
    /// This is a programming-error class: the pass fails loudly rather than
    /// producing wrong recommendations.
    #[error("statistics invariant violated: {0}")]
    Invariant(String),

    /// The configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Error reported by a mail-source collaborator.
///
/// Hosts wrap whatever their backend produces into this; the engine only
/// ever logs or skips on it, so a message string is the whole contract.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(msg: impl Into<String>) -> Self {
        SourceError(msg.into())
    }
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        SourceError(e.to_string())
    }
}
