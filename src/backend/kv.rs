use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{Backend, KeyValueStore, StorageMode};
use crate::{
    document::{Document, META_SECTION, VERSION_KEY},
    error::{Error, Result},
    section::Section,
};

/// Wrapper used to store a list of names as a single JSON value.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StringList {
    items: Vec<String>,
}

/// Settings stored as individual entries of a [`KeyValueStore`].
///
/// Under `prefix` the store holds:
///
/// | key | value |
/// |---|---|
/// | `<prefix>Sections` | section names |
/// | `<prefix><Section>_Keys` | key names of one section |
/// | `<prefix><Section>_<Key>` | one serialized value |
/// | `<prefix>Version` | schema version |
///
/// Saving settings that would share an entry fails with
/// [`Error::EntryCollision`] and leaves the store untouched.
pub struct KeyValueBackend {
    store: Box<dyn KeyValueStore>,
    prefix: String,
}

impl KeyValueBackend {
    pub fn new(store: impl KeyValueStore + 'static, prefix: impl Into<String>) -> Self {
        Self::from_boxed(Box::new(store), prefix)
    }

    pub fn from_boxed(store: Box<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn sections_key(&self) -> String {
        format!("{}Sections", self.prefix)
    }

    fn keys_key(&self, section: &str) -> String {
        format!("{}{section}_Keys", self.prefix)
    }

    fn value_key(&self, section: &str, key: &str) -> String {
        format!("{}{section}_{key}", self.prefix)
    }

    fn version_key(&self) -> String {
        format!("{}{VERSION_KEY}", self.prefix)
    }

    fn read_list(&self, entry: &str) -> Option<Vec<String>> {
        let raw = self.store.get(entry)?;
        match serde_json::from_str::<StringList>(&raw) {
            Ok(list) => Some(list.items),
            Err(err) => {
                warn!(entry = %entry, error = %err, "malformed list entry; ignoring");
                None
            }
        }
    }

    /// Every entry `save` would write, checked for collisions.
    ///
    /// Section and key names are joined with `_`, so distinct settings can
    /// map to one entry: a key named `Keys` shadows its section's key list,
    /// and key `B_C` of section `A` meets key `C` of section `A_B`.
    fn plan_entries(&self, sections: &[&Section]) -> Result<Vec<(String, String)>> {
        let mut owners: BTreeMap<String, String> = BTreeMap::new();
        let mut entries = Vec::new();
        let mut claim = |entry: String, owner: String, value: String| -> Result<()> {
            if let Some(first) = owners.get(&entry) {
                return Err(Error::EntryCollision {
                    entry,
                    first: first.clone(),
                    second: owner,
                });
            }
            owners.insert(entry.clone(), owner);
            entries.push((entry, value));
            Ok(())
        };

        let names = sections.iter().map(|s| s.name().to_string()).collect();
        claim(self.sections_key(), "section list".to_string(), encode_list(names)?)?;

        for section in sections {
            let values = section.serialize();
            let keys = values.iter().map(|(k, _)| k.clone()).collect();
            claim(
                self.keys_key(section.name()),
                format!("{} key list", section.name()),
                encode_list(keys)?,
            )?;

            for (key, value) in values {
                if section.name() == META_SECTION && key == VERSION_KEY {
                    claim(self.version_key(), "schema version".to_string(), value.clone())?;
                }
                claim(
                    self.value_key(section.name(), &key),
                    format!("{}.{key}", section.name()),
                    value,
                )?;
            }
        }

        Ok(entries)
    }

    /// Removes every entry reachable from the recorded lists.
    fn clear_entries(&mut self) -> usize {
        let mut removed = 0;
        let sections_key = self.sections_key();

        for section in self.read_list(&sections_key).unwrap_or_default() {
            let keys_key = self.keys_key(&section);
            for key in self.read_list(&keys_key).unwrap_or_default() {
                let value_key = self.value_key(&section, &key);
                removed += usize::from(self.store.remove(&value_key));
            }
            removed += usize::from(self.store.remove(&keys_key));
        }

        let version_key = self.version_key();
        removed += usize::from(self.store.remove(&version_key));
        removed += usize::from(self.store.remove(&sections_key));
        removed
    }
}

fn encode_list(items: Vec<String>) -> Result<String> {
    Ok(serde_json::to_string(&StringList { items })?)
}

impl Backend for KeyValueBackend {
    fn exists(&self) -> bool {
        self.store.contains(&self.sections_key())
    }

    fn load(&self) -> Result<Document> {
        let mut document = Document::new();
        let Some(sections) = self.read_list(&self.sections_key()) else {
            debug!(location = %self.path(), "no stored settings yet");
            return Ok(document);
        };

        for section in sections {
            document.ensure_section(&section);
            for key in self.read_list(&self.keys_key(&section)).unwrap_or_default() {
                match self.store.get(&self.value_key(&section, &key)) {
                    Some(value) => {
                        document.insert(&section, key, value);
                    }
                    None => debug!(section = %section, key = %key, "listed key has no value"),
                }
            }
        }

        if document.get(META_SECTION, VERSION_KEY).is_none() {
            if let Some(version) = self.store.get(&self.version_key()) {
                document.insert(META_SECTION, VERSION_KEY, version);
            }
        }

        Ok(document)
    }

    fn save(&mut self, sections: &[&Section]) -> Result<()> {
        let entries = self.plan_entries(sections).inspect_err(|err| {
            error!(location = %self.path(), error = %err, "refusing to save colliding entries");
        })?;

        // Drop entries of keys or sections that no longer exist.
        self.clear_entries();
        for (entry, value) in &entries {
            self.store.set(entry, value);
        }

        self.store.flush().inspect_err(|err| {
            error!(location = %self.path(), error = %err, "failed to flush preference store");
        })?;
        info!(location = %self.path(), sections = sections.len(), "saved settings to store");
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        let removed = self.clear_entries();
        self.store.flush()?;
        info!(location = %self.path(), removed, "deleted stored settings");
        Ok(())
    }

    fn path(&self) -> String {
        format!("{}#{}", self.store.location(), self.prefix)
    }

    fn mode(&self) -> StorageMode {
        StorageMode::KeyValueStore
    }
}
