//! Advisory cache of machine translations.
//!
//! Entries are keyed by a hash of the target language and the source text.
//! A miss only means the text gets translated again.

use crate::error::CacheError;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Key for `text` translated into `language`: hex SHA-256 of `language\0text`.
pub fn cache_key(text: &str, language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(language.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub trait TranslationCache: Send + Sync {
    fn get(&self, text: &str, language: &str) -> Option<String>;
    fn put(&self, text: &str, language: &str, translation: &str);
}

fn lock(entries: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    // Entries are plain strings, a poisoned map is still consistent.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cache that lives for one process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TranslationCache for MemoryCache {
    fn get(&self, text: &str, language: &str) -> Option<String> {
        lock(&self.entries).get(&cache_key(text, language)).cloned()
    }

    fn put(&self, text: &str, language: &str, translation: &str) {
        lock(&self.entries).insert(cache_key(text, language), translation.to_string());
    }
}

/// Cache backed by a JSON file of `key -> translation`.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
    dirty: Mutex<bool>,
}

impl FileCache {
    /// Load the cache at `path`. A missing file starts an empty cache; an
    /// unreadable or malformed one is logged and ignored.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(entries) => {
                    debug!("Loaded {} cached translations from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!("Ignoring malformed cache file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
            dirty: Mutex::new(false),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache back to disk if anything was added since loading.
    /// Returns whether a write happened.
    pub fn persist(&self) -> Result<bool, CacheError> {
        let mut dirty = self.dirty.lock().unwrap_or_else(|p| p.into_inner());
        if !*dirty {
            return Ok(false);
        }

        // Sorted keys keep the file diff-friendly between runs.
        let sorted: BTreeMap<String, String> = lock(&self.entries).clone().into_iter().collect();
        let content = serde_json::to_string_pretty(&sorted)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        std::fs::write(&self.path, content).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })?;

        *dirty = false;
        Ok(true)
    }
}

impl TranslationCache for FileCache {
    fn get(&self, text: &str, language: &str) -> Option<String> {
        lock(&self.entries).get(&cache_key(text, language)).cloned()
    }

    fn put(&self, text: &str, language: &str, translation: &str) {
        let previous =
            lock(&self.entries).insert(cache_key(text, language), translation.to_string());
        if previous.as_deref() != Some(translation) {
            *self.dirty.lock().unwrap_or_else(|p| p.into_inner()) = true;
        }
    }
}

/// The cache a run uses: in-memory, or file-backed when a path is configured.
#[derive(Debug)]
pub enum CacheStore {
    Memory(MemoryCache),
    File(FileCache),
}

impl CacheStore {
    pub fn open(path: Option<&Path>) -> Self {
        match path {
            Some(path) => CacheStore::File(FileCache::load(path)),
            None => CacheStore::Memory(MemoryCache::new()),
        }
    }

    /// Persist a file-backed cache; a no-op for the in-memory one.
    pub fn persist(&self) -> Result<bool, CacheError> {
        match self {
            CacheStore::Memory(_) => Ok(false),
            CacheStore::File(cache) => cache.persist(),
        }
    }
}

impl TranslationCache for CacheStore {
    fn get(&self, text: &str, language: &str) -> Option<String> {
        match self {
            CacheStore::Memory(cache) => cache.get(text, language),
            CacheStore::File(cache) => cache.get(text, language),
        }
    }

    fn put(&self, text: &str, language: &str, translation: &str) {
        match self {
            CacheStore::Memory(cache) => cache.put(text, language, translation),
            CacheStore::File(cache) => cache.put(text, language, translation),
        }
    }
}
