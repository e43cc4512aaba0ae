use indexmap::IndexMap;

use crate::config::Config;
use crate::source::MailItem;

/// Term occurrence counts for a single item.
///
/// Ephemeral: built fresh per item by the extractor, consumed by the store
/// deltas and the classifier, never persisted. Counts are `f64` because
/// every downstream computation is floating point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    counts: IndexMap<String, f64>,
}

impl TermVector {
    pub fn new() -> Self {
        TermVector { counts: IndexMap::new() }
    }

    /// Count one occurrence of a term.
    pub fn add_term(&mut self, term: &str) {
        *self.counts.entry(term.to_string()).or_insert(0.0) += 1.0;
    }

    /// Occurrences of `term` in this item (0 when absent).
    pub fn count(&self, term: &str) -> f64 {
        self.counts.get(term).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.counts.iter().map(|(term, &count)| (term.as_str(), count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for TermVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        TermVector {
            counts: iter.into_iter().map(|(term, count)| (term.into(), count)).collect(),
        }
    }
}

/// One raw field value on its way into the extractor.
#[derive(Debug, Clone, Copy)]
pub struct RawField<'a> {
    pub text: &'a str,
    /// Multi-word values (addressee names) collapse into single tokens:
    /// internal spaces become underscores before tokenization.
    pub no_spaces: bool,
}

/// Turns raw item text into a filtered term vector.
///
/// Pure: the output depends only on the fields, the resolved language and
/// the configured stopword tables.
pub struct TermExtractor<'a> {
    config: &'a Config,
}

impl<'a> TermExtractor<'a> {
    pub fn new(config: &'a Config) -> Self {
        TermExtractor { config }
    }

    /// Extract a term vector from an ordered sequence of raw fields.
    ///
    /// Tokens split on whitespace; each token is lower-cased and stripped of
    /// leading/trailing non-word characters. Tokens shorter than two
    /// characters and stopwords for the resolved language are dropped.
    pub fn extract(&self, fields: &[RawField<'_>], language: Option<&str>) -> TermVector {
        let mut vector = TermVector::new();
        for field in fields {
            if field.no_spaces {
                let joined = field.text.replace(' ', "_");
                self.scan(&joined, language, &mut vector);
            } else {
                self.scan(field.text, language, &mut vector);
            }
        }
        vector
    }

    /// Extract from an item, using the configured field lists: no-spaces
    /// fields first (one value per token), then the as-is fields.
    pub fn extract_item<I: MailItem>(&self, item: &I) -> TermVector {
        let mut owned: Vec<(String, bool)> = Vec::new();
        for name in &self.config.fields_no_spaces {
            for value in item.field_values(name) {
                owned.push((value, true));
            }
        }
        for name in &self.config.fields_as_is {
            for value in item.field_values(name) {
                owned.push((value, false));
            }
        }
        let fields: Vec<RawField<'_>> = owned
            .iter()
            .map(|(text, no_spaces)| RawField { text, no_spaces: *no_spaces })
            .collect();
        // No per-item language detection; the default language resolves the
        // stopword list.
        self.extract(&fields, None)
    }

    fn scan(&self, text: &str, language: Option<&str>, vector: &mut TermVector) {
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let term = token.trim_matches(|c: char| !is_word_char(c));
            if term.chars().count() < 2 {
                continue;
            }
            if self.config.is_stop_word(term, language) {
                continue;
            }
            vector.add_term(term);
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
