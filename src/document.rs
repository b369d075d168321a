//! The flat `section -> key -> text` shape exchanged between backends,
//! the migrator and sections.

use std::collections::BTreeMap;

/// Reserved section holding schema metadata.
pub const META_SECTION: &str = "Meta";

/// Key under [`META_SECTION`] that records the schema version.
pub const VERSION_KEY: &str = "Version";

/// Backend-agnostic persisted settings.
///
/// Built fresh on every load and save; never kept as the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn contains_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }

    pub fn section_mut(&mut self, section: &str) -> Option<&mut BTreeMap<String, String>> {
        self.sections.get_mut(section)
    }

    /// Returns the named section, creating it empty if missing.
    pub fn ensure_section(&mut self, section: &str) -> &mut BTreeMap<String, String> {
        self.sections.entry(section.to_string()).or_default()
    }

    pub fn remove_section(&mut self, section: &str) -> Option<BTreeMap<String, String>> {
        self.sections.remove(section)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, String>)> {
        self.sections.iter().map(|(name, keys)| (name.as_str(), keys))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(
        &mut self,
        section: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.ensure_section(section).insert(key.into(), value.into())
    }

    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.remove(key)
    }

    /// Moves a value to a new key within the same section.
    ///
    /// Does nothing and returns `false` when `from` is absent, so a rename
    /// can safely run against data that was already renamed.
    pub fn rename_key(&mut self, section: &str, from: &str, to: &str) -> bool {
        match self.remove(section, from) {
            Some(value) => {
                self.insert(section, to, value);
                true
            }
            None => false,
        }
    }

    /// Schema version recorded under `Meta.Version`.
    ///
    /// Missing or unparsable versions read as `0`, the pre-versioning baseline.
    pub fn version(&self) -> u32 {
        self.get(META_SECTION, VERSION_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn set_version(&mut self, version: u32) {
        self.insert(META_SECTION, VERSION_KEY, version.to_string());
    }
}

impl FromIterator<(String, BTreeMap<String, String>)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, BTreeMap<String, String>)>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}
