use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Built-in English stopword list, used when no list was loaded for "en".
static BUILTIN_STOPWORDS_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "all", "am", "an",
        "and", "any", "are", "aren't", "as", "at", "be", "because", "been",
        "before", "being", "below", "between", "both", "but", "by", "can",
        "cannot", "could", "couldn't", "did", "didn't", "do", "does",
        "doesn't", "doing", "don't", "down", "during", "each", "few", "for",
        "from", "further", "had", "hadn't", "has", "hasn't", "have",
        "haven't", "having", "he", "her", "here", "hers", "herself", "him",
        "himself", "his", "how", "if", "in", "into", "is", "isn't", "it",
        "its", "itself", "just", "me", "more", "most", "my", "myself", "no",
        "nor", "not", "now", "of", "off", "on", "once", "only", "or",
        "other", "our", "ours", "ourselves", "out", "over", "own", "re",
        "same", "she", "should", "shouldn't", "so", "some", "such", "than",
        "that", "the", "their", "theirs", "them", "themselves", "then",
        "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "wasn't", "we", "were",
        "weren't", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "won't", "would", "wouldn't", "you", "your",
        "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fields_no_spaces() -> Vec<String> {
    vec!["From".into(), "CopyTo".into(), "BlindCopyTo".into()]
}

fn default_fields_as_is() -> Vec<String> {
    vec!["Subject".into(), "Body".into()]
}

/// Engine configuration.
///
/// Read-only input to the term extractor and the exclusion checks; the
/// engine never mutates it. Deserializable from TOML, constructible in code
/// for tests and embedding hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Stopword language used when an item's language cannot be resolved.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages with a stopword list on disk, mapped to the list file.
    /// The file format: one word per line, `#` starts a comment (full-line
    /// or trailing), blank lines ignored.
    #[serde(default)]
    pub stopword_files: HashMap<String, PathBuf>,

    /// Fields whose values are single tokens even when they contain spaces
    /// (sender and addressee names); internal spaces become underscores.
    #[serde(default = "default_fields_no_spaces")]
    pub fields_no_spaces: Vec<String>,

    /// Fields processed as free text.
    #[serde(default = "default_fields_as_is")]
    pub fields_as_is: Vec<String>,

    /// Folder names that never participate in counts or recommendations.
    #[serde(default)]
    pub excluded_folders: Vec<String>,

    /// Treat folders whose name starts with `(` as excluded.
    #[serde(default = "default_true")]
    pub ignore_hidden_folders: bool,

    /// Folders whose items get recommendations written during a pass.
    /// These are looked up by name even when hidden.
    #[serde(default)]
    pub classify_folders: Vec<String>,

    /// Where the model snapshot lives on disk.
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Loaded stopword lists, keyed by language.
    #[serde(skip)]
    stopwords: HashMap<String, HashSet<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            stopword_files: HashMap::new(),
            fields_no_spaces: default_fields_no_spaces(),
            fields_as_is: default_fields_as_is(),
            excluded_folders: Vec::new(),
            ignore_hidden_folders: true,
            classify_folders: Vec::new(),
            model_path: None,
            stopwords: HashMap::new(),
        }
    }
}

impl Config {
    /// Load a TOML configuration file and any stopword lists it names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        let mut config: Config =
            toml::from_str(&text).map_err(|e| EngineError::Config(e.to_string()))?;
        for (language, file) in config.stopword_files.clone() {
            config.load_stopword_file(&language, &file)?;
        }
        Ok(config)
    }

    /// Read one stopword list file for a language.
    pub fn load_stopword_file(
        &mut self,
        language: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        let words = parse_stopword_list(&text);
        self.stopwords.insert(language.to_string(), words);
        Ok(())
    }

    /// Replace the stopword list for a language.
    pub fn set_stopwords<I, S>(&mut self, language: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords
            .insert(language.to_string(), words.into_iter().map(Into::into).collect());
    }

    /// Is `word` a stopword in `language`?
    ///
    /// `None` resolves to the default language. An unknown language has no
    /// stopwords, except "en" which falls back to the built-in list.
    pub fn is_stop_word(&self, word: &str, language: Option<&str>) -> bool {
        let language = language.unwrap_or(&self.default_language);
        if let Some(list) = self.stopwords.get(language) {
            return list.contains(word);
        }
        language == "en" && BUILTIN_STOPWORDS_EN.contains(word)
    }

    /// Folders excluded from counting and recommendations: empty names,
    /// hidden folders (leading `(`) when configured, and the explicit list.
    pub fn is_excluded_folder(&self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }
        if self.ignore_hidden_folders && name.starts_with('(') {
            return true;
        }
        self.excluded_folders.iter().any(|f| f == name)
    }
}

/// One word per line; `#` opens a comment; blanks skipped.
fn parse_stopword_list(text: &str) -> HashSet<String> {
    let mut words = HashSet::new();
    for line in text.lines() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let word = line.trim();
        if !word.is_empty() {
            words.insert(word.to_string());
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_and_listed_folders_are_excluded() {
        let mut config = Config::default();
        config.excluded_folders = vec!["Trash".to_string()];

        assert!(config.is_excluded_folder(""));
        assert!(config.is_excluded_folder("($Inbox)"));
        assert!(config.is_excluded_folder("Trash"));
        assert!(!config.is_excluded_folder("Projects"));

        config.ignore_hidden_folders = false;
        assert!(!config.is_excluded_folder("($Inbox)"));
    }

    #[test]
    fn stopwords_fall_back_to_builtin_english() {
        let config = Config::default();
        assert!(config.is_stop_word("the", None));
        assert!(config.is_stop_word("the", Some("en")));
        assert!(!config.is_stop_word("invoice", None));
        // Unknown language has no list at all.
        assert!(!config.is_stop_word("the", Some("fr")));
    }

    #[test]
    fn loaded_list_replaces_builtin() {
        let mut config = Config::default();
        config.set_stopwords("en", ["foo"]);
        assert!(config.is_stop_word("foo", None));
        assert!(!config.is_stop_word("the", None));
    }

    #[test]
    fn stopword_list_parsing_strips_comments_and_blanks() {
        let words = parse_stopword_list(
            "# full line comment\nalpha\n\nbeta # trailing comment\n   gamma   \n#\n",
        );
        assert_eq!(words.len(), 3);
        assert!(words.contains("alpha"));
        assert!(words.contains("beta"));
        assert!(words.contains("gamma"));
    }

    #[test]
    fn toml_defaults_cover_field_lists() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.default_language, "en");
        assert_eq!(config.fields_no_spaces, vec!["From", "CopyTo", "BlindCopyTo"]);
        assert_eq!(config.fields_as_is, vec!["Subject", "Body"]);
        assert!(config.ignore_hidden_folders);
    }

    #[test]
    fn load_reads_toml_and_stopword_files() {
        let dir = tempfile::tempdir().unwrap();
        let words_path = dir.path().join("stopwords.de");
        fs::write(&words_path, "und\noder # conjunction\n").unwrap();

        let config_path = dir.path().join("folder-rank.toml");
        fs::write(
            &config_path,
            format!(
                "default_language = \"de\"\n\
                 excluded_folders = [\"Trash\"]\n\
                 classify_folders = [\"($Inbox)\"]\n\
                 [stopword_files]\n\
                 de = {:?}\n",
                words_path
            ),
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.default_language, "de");
        assert!(config.is_stop_word("und", None));
        assert!(config.is_stop_word("oder", Some("de")));
        assert!(!config.is_stop_word("budget", None));
        assert!(config.is_excluded_folder("Trash"));
        assert_eq!(config.classify_folders, vec!["($Inbox)"]);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load("/nonexistent/folder-rank.toml").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
