use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::{env, fs, path::Path, path::PathBuf, process};

use folder_rank::{
    Config, Engine, Folder, FsModelStore, MailItem, MailSource, PassOutcome, RecordedState,
    Recommendation, SourceError,
};

// Demo driver: treats a directory tree as a tiny mail store. Every
// subdirectory is a folder, every file in it an item ("Header: value" lines,
// a blank line, then the body). Items under Inbox/ get recommendations.
//
//   folder-rank <maildir> [--model <file>]
//
// Filing decisions are made by moving files between directories and running
// the pass again.

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let Some(root) = args.next().map(PathBuf::from) else {
        eprintln!("usage: folder-rank <maildir> [--model <file>]");
        process::exit(2);
    };
    let mut model_path = root.join("folder-rank-model.cbor");
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--model" => {
                model_path = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or("--model needs a file argument")?;
            }
            other => return Err(format!("unknown argument: {other}").into()),
        }
    }

    let config_path = root.join("folder-rank.toml");
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };
    if config.classify_folders.is_empty() {
        config.classify_folders = vec!["Inbox".to_string()];
    }
    // The inbox holds unfiled mail; it must not be learned as a destination.
    for target in config.classify_folders.clone() {
        if !config.is_excluded_folder(&target) {
            config.excluded_folders.push(target);
        }
    }

    let mut source = DirSource::scan(&root)?;
    let models = FsModelStore::new(&model_path);
    let mut engine = Engine::new(config);

    match engine.run_pass(&mut source, &models)? {
        PassOutcome::Completed(summary) => {
            println!(
                "pass complete: rebuilt={} classified={} learned={} skipped={}",
                summary.rebuilt, summary.classified, summary.learned, summary.skipped
            );
        }
        PassOutcome::SkippedBusy => unreachable!("single caller"),
    }

    for item in source.classified_items() {
        let data = item.0.borrow();
        println!("{}", data.title);
        if data.recommendations.is_empty() {
            println!("    no recommendation (empty model? file some items first)");
        }
        for (rank, rec) in data.recommendations.iter().enumerate() {
            println!("    {}. {} ({:.4})", rank + 1, rec.folder, rec.score);
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct ItemData {
    title: String,
    fields: HashMap<String, Vec<String>>,
    folder: String,
    recorded: Option<RecordedState>,
    recommendations: Vec<Recommendation>,
}

#[derive(Clone)]
struct DirItem(Rc<RefCell<ItemData>>);

impl MailItem for DirItem {
    fn field_values(&self, field: &str) -> Vec<String> {
        self.0.borrow().fields.get(field).cloned().unwrap_or_default()
    }

    fn current_folders(&self) -> Result<Vec<String>, SourceError> {
        Ok(vec![self.0.borrow().folder.clone()])
    }

    fn recorded_state(&self) -> Option<RecordedState> {
        self.0.borrow().recorded.clone()
    }

    fn set_recorded_state(&mut self, state: RecordedState) -> Result<(), SourceError> {
        self.0.borrow_mut().recorded = Some(state);
        Ok(())
    }

    fn has_recommendations(&self) -> bool {
        !self.0.borrow().recommendations.is_empty()
    }

    fn set_recommendations(&mut self, ranked: &[Recommendation]) -> Result<(), SourceError> {
        self.0.borrow_mut().recommendations = ranked.to_vec();
        Ok(())
    }
}

struct DirSource {
    folders: Vec<Folder>,
    items: Vec<DirItem>,
}

impl DirSource {
    /// Read the whole tree up front; the demo store is small by definition.
    fn scan(root: &Path) -> Result<Self, SourceError> {
        let mut folders = Vec::new();
        let mut items = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            folders.push(Folder::new(name.clone(), name.clone()));
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                if !file.file_type()?.is_file() {
                    continue;
                }
                let text = fs::read_to_string(file.path())?;
                items.push(DirItem(Rc::new(RefCell::new(ItemData {
                    title: format!("{name}/{}", file.file_name().to_string_lossy()),
                    fields: parse_fields(&text),
                    folder: name.clone(),
                    ..ItemData::default()
                }))));
            }
        }
        Ok(DirSource { folders, items })
    }

    fn classified_items(&self) -> impl Iterator<Item = &DirItem> {
        self.items.iter().filter(|item| item.has_recommendations())
    }
}

impl MailSource for DirSource {
    type Item = DirItem;

    fn folders(&mut self) -> Result<Vec<Folder>, SourceError> {
        Ok(self.folders.clone())
    }

    fn items_in(&mut self, folder: &Folder) -> Result<Vec<DirItem>, SourceError> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.0.borrow().folder == folder.name)
            .cloned()
            .collect())
    }

    fn all_items(&mut self) -> Result<Vec<DirItem>, SourceError> {
        Ok(self.items.clone())
    }
}

/// "Header: value" lines, then a blank line, then the body. Repeated
/// headers accumulate values.
fn parse_fields(text: &str) -> HashMap<String, Vec<String>> {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut lines = text.lines();
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                fields.entry(name.trim().to_string()).or_default().push(value.trim().to_string());
            }
            None => {
                // Not a header after all; the whole file is body text.
                fields.entry("Body".to_string()).or_default().push(text.to_string());
                return fields;
            }
        }
    }
    let body: String = lines.collect::<Vec<_>>().join("\n");
    if !body.trim().is_empty() {
        fields.entry("Body".to_string()).or_default().push(body);
    }
    fields
}
