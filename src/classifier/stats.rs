use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::store::FrequencyStore;
use crate::error::EngineError;

/// The derived statistics tables: IDF per term, TF-IDF per (term, folder)
/// and the Euclidean vector length per folder.
///
/// Never patched incrementally. Any material change to the frequency store
/// or the folder set invalidates the whole value and it is recomputed from
/// scratch; classification reads one `ModelStats` for the whole pass, so it
/// can never observe half-updated tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    idf: IndexMap<String, f64>,
    tfidf: IndexMap<String, IndexMap<String, f64>>,
    vector_lengths: IndexMap<String, f64>,
}

impl ModelStats {
    /// Full recompute over a frequency-store snapshot.
    ///
    /// `total_folders` is the number of known non-excluded folders at build
    /// time. Cost is linear in the number of nonzero (term, folder) pairs.
    pub fn compute(store: &FrequencyStore, total_folders: usize) -> Result<Self, EngineError> {
        if total_folders == 0 && !store.is_empty() {
            // df >= 1 for every stored term, so a folderless model with
            // counts cannot produce a finite idf.
            return Err(EngineError::Invariant(
                "frequency store has counts but no folders are known".to_string(),
            ));
        }
        let idf = compute_idf(store, total_folders);
        let tfidf = compute_tfidf(store, &idf);
        let vector_lengths = compute_vector_lengths(&tfidf);
        Ok(ModelStats { idf, tfidf, vector_lengths })
    }

    pub(crate) fn from_parts(
        idf: IndexMap<String, f64>,
        tfidf: IndexMap<String, IndexMap<String, f64>>,
        vector_lengths: IndexMap<String, f64>,
    ) -> Self {
        ModelStats { idf, tfidf, vector_lengths }
    }

    /// IDF weight for a term; terms the model has never seen weigh nothing.
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    /// Per-folder TF-IDF weights for a term.
    pub fn folder_weights(&self, term: &str) -> Option<&IndexMap<String, f64>> {
        self.tfidf.get(term)
    }

    /// Euclidean norm of a folder's TF-IDF vector; 0 when unknown.
    pub fn vector_length(&self, folder: &str) -> f64 {
        self.vector_lengths.get(folder).copied().unwrap_or(0.0)
    }

    /// True when nothing has been learned yet; classification over an empty
    /// model yields no recommendations.
    pub fn is_empty(&self) -> bool {
        self.tfidf.is_empty()
    }

    pub(crate) fn idf_table(&self) -> &IndexMap<String, f64> {
        &self.idf
    }

    pub(crate) fn tfidf_table(&self) -> &IndexMap<String, IndexMap<String, f64>> {
        &self.tfidf
    }

    pub(crate) fn vector_length_table(&self) -> &IndexMap<String, f64> {
        &self.vector_lengths
    }
}

/// `idf = ln(total_folders / df)` for every stored term. df is the row
/// width, which is at least 1 for any term present in the store.
fn compute_idf(store: &FrequencyStore, total_folders: usize) -> IndexMap<String, f64> {
    let mut idf = IndexMap::with_capacity(store.len());
    for (term, row) in store.iter() {
        let df = row.len() as f64;
        idf.insert(term.to_string(), (total_folders as f64 / df).ln());
    }
    idf
}

/// `tfidf = raw_count * idf`, only over entries present in the store.
fn compute_tfidf(
    store: &FrequencyStore,
    idf: &IndexMap<String, f64>,
) -> IndexMap<String, IndexMap<String, f64>> {
    let mut tfidf = IndexMap::with_capacity(store.len());
    for (term, row) in store.iter() {
        let weight = idf.get(term).copied().unwrap_or(0.0);
        let weighted: IndexMap<String, f64> = row
            .iter()
            .map(|(folder, &count)| (folder.clone(), count * weight))
            .collect();
        tfidf.insert(term.to_string(), weighted);
    }
    tfidf
}

/// Sum squared weights per folder across all terms, then take the root.
fn compute_vector_lengths(
    tfidf: &IndexMap<String, IndexMap<String, f64>>,
) -> IndexMap<String, f64> {
    let mut sums: IndexMap<String, f64> = IndexMap::new();
    for row in tfidf.values() {
        for (folder, &weight) in row {
            *sums.entry(folder.clone()).or_insert(0.0) += weight * weight;
        }
    }
    sums.into_iter().map(|(folder, sum)| (folder, sum.sqrt())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::extract::TermVector;

    const EPS: f64 = 1e-12;

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        pairs.iter().map(|&(t, c)| (t, c)).collect()
    }

    /// Two folders, the worked scenario: Projects{invoice:3, budget:2},
    /// Personal{invoice:1, vacation:4}.
    fn two_folder_store() -> FrequencyStore {
        let mut store = FrequencyStore::new();
        store.add_counts(&vector(&[("invoice", 3.0), ("budget", 2.0)]), "Projects");
        store.add_counts(&vector(&[("invoice", 1.0), ("vacation", 4.0)]), "Personal");
        store
    }

    #[test]
    fn idf_of_everywhere_terms_is_zero() {
        let stats = ModelStats::compute(&two_folder_store(), 2).unwrap();
        let ln2 = 2.0_f64.ln();

        // invoice appears in both folders: idf = ln(2/2) = 0.
        assert!(stats.idf("invoice").abs() < EPS);
        assert!((stats.idf("budget") - ln2).abs() < EPS);
        assert!((stats.idf("vacation") - ln2).abs() < EPS);
        // Unknown terms weigh nothing.
        assert_eq!(stats.idf("unseen"), 0.0);
    }

    #[test]
    fn tfidf_and_vector_lengths_match_the_worked_scenario() {
        let stats = ModelStats::compute(&two_folder_store(), 2).unwrap();
        let ln2 = 2.0_f64.ln();

        let budget = stats.folder_weights("budget").unwrap();
        assert!((budget["Projects"] - 2.0 * ln2).abs() < EPS);
        let vacation = stats.folder_weights("vacation").unwrap();
        assert!((vacation["Personal"] - 4.0 * ln2).abs() < EPS);

        // invoice weighs zero everywhere, so the folder norms come from
        // budget and vacation alone.
        let invoice = stats.folder_weights("invoice").unwrap();
        assert!(invoice["Projects"].abs() < EPS);
        assert!(invoice["Personal"].abs() < EPS);

        assert!((stats.vector_length("Projects") - 2.0 * ln2).abs() < EPS);
        assert!((stats.vector_length("Personal") - 4.0 * ln2).abs() < EPS);
        assert_eq!(stats.vector_length("Elsewhere"), 0.0);
    }

    #[test]
    fn vector_length_is_the_euclidean_norm() {
        let mut store = FrequencyStore::new();
        store.add_counts(&vector(&[("alpha", 3.0), ("beta", 4.0)]), "F");
        // One folder of two: both terms have idf = ln(2/1).
        store.add_counts(&vector(&[("gamma", 1.0)]), "G");
        let stats = ModelStats::compute(&store, 2).unwrap();

        let ln2 = 2.0_f64.ln();
        let expected = ((3.0 * ln2).powi(2) + (4.0 * ln2).powi(2)).sqrt();
        assert!((stats.vector_length("F") - expected).abs() < EPS);
    }

    #[test]
    fn empty_store_computes_empty_stats() {
        let stats = ModelStats::compute(&FrequencyStore::new(), 0).unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.idf("anything"), 0.0);
    }

    #[test]
    fn counts_without_folders_violate_the_invariant() {
        let mut store = FrequencyStore::new();
        store.add_counts(&vector(&[("orphan", 1.0)]), "Gone");
        let err = ModelStats::compute(&store, 0).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(_)));
    }

    #[test]
    fn deleted_folder_counts_go_negative_not_infinite() {
        // A term counted in more folders than are currently known (a folder
        // was deleted, its counts not yet drained) yields a negative idf,
        // ln of a ratio below one. Scores stay finite.
        let stats = ModelStats::compute(&two_folder_store(), 1).unwrap();
        assert!(stats.idf("invoice") < 0.0);
        assert!(stats.idf("invoice").is_finite());
    }
}
