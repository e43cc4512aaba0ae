use std::fs;
use std::io;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::store::FrequencyStore;
use crate::error::EngineError;

/// Point-in-time image of the whole model: the folder list, the frequency
/// store and the three derived tables, serialized in that order as one
/// value.
///
/// Persistence and classification both consume the model only through this
/// tuple, so statistics can never be mixed across store states: the set
/// loads whole or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Known non-excluded folders, name to stable id.
    pub folders: IndexMap<String, String>,
    pub counts: FrequencyStore,
    pub idf: IndexMap<String, f64>,
    pub tfidf: IndexMap<String, IndexMap<String, f64>>,
    pub vector_lengths: IndexMap<String, f64>,
}

/// Why a snapshot failed to load. Either way the caller treats it as "no
/// model" and rebuilds; the variants exist so the log can tell a fresh
/// install from a damaged file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no model snapshot found")]
    NotFound,
    #[error("model snapshot unreadable: {0}")]
    Corrupt(String),
}

/// Where model snapshots live.
pub trait ModelStore {
    fn load(&self) -> Result<ModelSnapshot, LoadError>;
    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), EngineError>;
}

/// CBOR snapshot file on disk.
///
/// Saves write a sibling temp file and rename it into place, so a failed
/// save leaves the previous snapshot untouched and authoritative.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    path: PathBuf,
}

impl FsModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FsModelStore { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ModelStore for FsModelStore {
    fn load(&self) -> Result<ModelSnapshot, LoadError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound),
            Err(e) => return Err(LoadError::Corrupt(e.to_string())),
        };
        serde_cbor::from_slice(&bytes).map_err(|e| LoadError::Corrupt(e.to_string()))
    }

    fn save(&self, snapshot: &ModelSnapshot) -> Result<(), EngineError> {
        let bytes = serde_cbor::to_vec(snapshot).map_err(EngineError::Corrupt)?;
        let temp = self.temp_path();
        fs::write(&temp, &bytes).map_err(EngineError::Persist)?;
        fs::rename(&temp, &self.path).map_err(EngineError::Persist)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::extract::TermVector;
    use crate::classifier::stats::ModelStats;

    fn sample_snapshot() -> ModelSnapshot {
        let mut counts = FrequencyStore::new();
        let projects: TermVector =
            [("invoice", 3.0), ("budget", 2.0)].into_iter().collect();
        let personal: TermVector =
            [("invoice", 1.0), ("vacation", 4.0)].into_iter().collect();
        counts.add_counts(&projects, "Projects");
        counts.add_counts(&personal, "Personal");

        let stats = ModelStats::compute(&counts, 2).unwrap();
        ModelSnapshot {
            folders: [
                ("Projects".to_string(), "f1".to_string()),
                ("Personal".to_string(), "f2".to_string()),
            ]
            .into_iter()
            .collect(),
            idf: stats.idf_table().clone(),
            tfidf: stats.tfidf_table().clone(),
            vector_lengths: stats.vector_length_table().clone(),
            counts,
        }
    }

    #[test]
    fn snapshot_round_trips_structurally_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("model.cbor"));

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        let restored = store.load().unwrap();

        assert_eq!(snapshot, restored);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("absent.cbor"));
        assert!(matches!(store.load(), Err(LoadError::NotFound)));
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.cbor");
        fs::write(&path, b"not a snapshot").unwrap();

        let store = FsModelStore::new(path);
        assert!(matches!(store.load(), Err(LoadError::Corrupt(_))));
    }

    #[test]
    fn save_replaces_the_previous_snapshot_whole() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::new(dir.path().join("model.cbor"));

        store.save(&ModelSnapshot::default()).unwrap();
        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), snapshot);
        // The temp file never lingers.
        assert!(!store.temp_path().exists());
    }
}
