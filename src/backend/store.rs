use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use tracing::warn;

use crate::{atomic::AtomicFile, error::Result};

/// A flat string-to-string preference store, such as a browser's local
/// storage or a mobile platform's preferences API.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);

    /// Returns `false` if `key` was not present.
    fn remove(&mut self, key: &str) -> bool;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Makes pending writes durable.
    fn flush(&mut self) -> Result<()>;

    fn location(&self) -> String;
}

/// In-process store. Clones share the same entries, so a second handle can
/// observe what a backend persisted through the first.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Preference store kept as a flat TOML table on disk.
///
/// Entries are held in memory and written atomically on [`flush`](KeyValueStore::flush).
#[derive(Debug)]
pub struct TomlFileStore {
    file: AtomicFile,
    entries: BTreeMap<String, String>,
}

impl TomlFileStore {
    /// Opens the store at `path`. A missing file is an empty store; a file
    /// that is not a flat string table is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file = AtomicFile::new(path);
        let entries = match file.read()? {
            Some(contents) => match toml::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        path = %file.path().display(),
                        error = %err,
                        "unreadable preference store; starting empty"
                    );
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        Ok(Self { file, entries })
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn flush(&mut self) -> Result<()> {
        if self.entries.is_empty() {
            self.file.remove()?;
            return Ok(());
        }

        let contents = toml::to_string(&self.entries)?;
        self.file.write(&contents)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.file.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_entries() {
        let mut first = MemoryStore::new();
        let second = first.clone();

        first.set("Settings_Sections", "[]");
        assert_eq!(second.get("Settings_Sections").as_deref(), Some("[]"));
        assert!(first.remove("Settings_Sections"));
        assert!(second.is_empty());
    }

    #[test]
    fn toml_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");

        let mut store = TomlFileStore::open(&path).unwrap();
        store.set("Settings_Audio_MasterVolume", "0.5");
        store.set("Settings_Audio_Keys", r#"{"items":["MasterVolume"]}"#);
        store.flush().unwrap();

        let reopened = TomlFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("Settings_Audio_MasterVolume").as_deref(),
            Some("0.5")
        );
        assert_eq!(
            reopened.get("Settings_Audio_Keys").as_deref(),
            Some(r#"{"items":["MasterVolume"]}"#)
        );
    }

    #[test]
    fn toml_store_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "this is = = not toml [").unwrap();

        let store = TomlFileStore::open(&path).unwrap();
        assert!(!store.contains("anything"));
    }
}
