use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::extract::TermVector;
use crate::classifier::stats::ModelStats;

/// One ranked folder suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub folder: String,
    pub score: f64,
}

/// Fixed-size top-3: a candidate replaces slot 3 only when strictly
/// greater, then bubbles up through slots 2 and 1 under the same strict
/// test. Equal scores never displace, so the earlier-offered folder keeps
/// its rank.
#[derive(Debug, Default)]
struct TopThree {
    scores: [f64; 3],
    folders: [Option<String>; 3],
}

impl TopThree {
    fn offer(&mut self, folder: &str, score: f64) {
        if score > self.scores[2] {
            self.scores[2] = score;
            self.folders[2] = Some(folder.to_string());
            if score > self.scores[1] {
                self.scores[2] = self.scores[1];
                self.folders[2] = self.folders[1].take();
                self.scores[1] = score;
                self.folders[1] = Some(folder.to_string());
                if score > self.scores[0] {
                    self.scores[1] = self.scores[0];
                    self.folders[1] = self.folders[0].take();
                    self.scores[0] = score;
                    self.folders[0] = Some(folder.to_string());
                }
            }
        }
    }

    fn into_recommendations(self) -> Vec<Recommendation> {
        let TopThree { scores, folders } = self;
        folders
            .into_iter()
            .zip(scores)
            .filter_map(|(folder, score)| folder.map(|folder| Recommendation { folder, score }))
            .collect()
    }
}

/// Score an item's term vector against every folder and return up to three
/// recommendations, best first.
///
/// The similarity is `dot(folder, item) / item_length * folder_length`.
/// Note this deliberately multiplies by the folder's vector length where
/// true cosine similarity would divide; changing it would reorder every
/// recommendation users have trained against, so it stays.
///
/// Folders are ranked in lexicographic name order, so with the strict
/// bubble above a tie goes to the lexicographically smaller name. An item
/// with no weighted terms produces no recommendations.
pub fn classify(terms: &TermVector, stats: &ModelStats) -> Vec<Recommendation> {
    // TF-IDF weights of the item itself, and its vector length.
    let mut doc_tfidf: IndexMap<&str, f64> = IndexMap::with_capacity(terms.len());
    let mut squared_sum = 0.0;
    for (term, count) in terms.iter() {
        let weight = count * stats.idf(term);
        squared_sum += weight * weight;
        doc_tfidf.insert(term, weight);
    }
    let doc_length = squared_sum.sqrt();
    if doc_length == 0.0 {
        // Fully stopworded or idf-zero item: no signal, no recommendation.
        return Vec::new();
    }

    // Dot product against each folder sharing at least one weighted term.
    let mut dot_products: IndexMap<&str, f64> = IndexMap::new();
    for (term, &doc_weight) in &doc_tfidf {
        if let Some(folder_weights) = stats.folder_weights(term) {
            for (folder, &folder_weight) in folder_weights {
                *dot_products.entry(folder.as_str()).or_insert(0.0) +=
                    folder_weight * doc_weight;
            }
        }
    }

    let mut folders: Vec<&str> = dot_products.keys().copied().collect();
    folders.sort_unstable();

    let mut top = TopThree::default();
    for folder in folders {
        let dot = dot_products.get(folder).copied().unwrap_or(0.0);
        let similarity = dot / doc_length * stats.vector_length(folder);
        top.offer(folder, similarity);
    }
    top.into_recommendations()
}
