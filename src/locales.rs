use crate::error::LocaleError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory of `<language>.json` locale files.
#[derive(Debug, Clone)]
pub struct LocaleStore {
    dir: PathBuf,
}

impl LocaleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{}.json", language))
    }

    /// Languages with a locale file, other than `source_language`, sorted.
    pub fn discover_languages(&self, source_language: &str) -> Result<Vec<String>, LocaleError> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|source| LocaleError::Read {
            path: self.dir.clone(),
            source,
        })?;

        let mut languages: Vec<String> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .filter(|language| language != source_language)
            .collect();

        languages.sort();
        Ok(languages)
    }

    /// Load the source tree. Any problem here is fatal for a run.
    pub fn load_source(&self, language: &str) -> Result<Value, LocaleError> {
        let path = self.path_for(language);
        let content = std::fs::read_to_string(&path).map_err(|source| LocaleError::Read {
            path: path.clone(),
            source,
        })?;

        let tree: Value = serde_json::from_str(&content).map_err(|source| LocaleError::Parse {
            path: path.clone(),
            source,
        })?;

        if !tree.is_object() {
            return Err(LocaleError::NotAnObject { path });
        }
        Ok(tree)
    }

    /// Load an existing target tree, falling back to an empty tree when the
    /// file is missing, unreadable, malformed or not an object.
    pub fn load_target(&self, language: &str) -> Value {
        let path = self.path_for(language);
        let empty = || Value::Object(Map::new());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting from an empty tree", path.display());
                return empty();
            }
            Err(e) => {
                warn!("Could not read {}, starting from an empty tree: {}", path.display(), e);
                return empty();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(tree) if tree.is_object() => tree,
            Ok(_) => {
                warn!("{} is not a JSON object, starting from an empty tree", path.display());
                empty()
            }
            Err(e) => {
                warn!("Could not parse {}, starting from an empty tree: {}", path.display(), e);
                empty()
            }
        }
    }

    /// Write `tree` as pretty-printed JSON, replacing the file in one rename.
    pub fn write(&self, language: &str, tree: &Value) -> Result<PathBuf, LocaleError> {
        let path = self.path_for(language);
        let mut content = serde_json::to_string_pretty(tree)?;
        content.push('\n');

        let tmp_path = self.dir.join(format!(".{}.json.tmp", language));
        let write_err = |source| LocaleError::Write {
            path: path.clone(),
            source,
        };

        std::fs::write(&tmp_path, content).map_err(write_err)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        Ok(path)
    }
}
