//! Named groups of settings.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    setting::{AnySetting, Setting, SettingValue, ValueKind},
};

/// An ordered collection of settings sharing one namespace.
///
/// Keys are unique within a section and keep their registration order,
/// which is the order [`serialize`](Section::serialize) reports them in.
pub struct Section {
    name: String,
    comment: Option<String>,
    settings: Vec<Box<dyn AnySetting>>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            settings: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder-style [`add_setting`](Section::add_setting). Duplicate keys are
    /// logged and skipped.
    pub fn with_setting<T: SettingValue>(
        mut self,
        key: impl Into<String>,
        comment: Option<&str>,
        default: T,
    ) -> Self {
        let _ = self.add_setting(key, comment, None, default);
        self
    }

    /// Builds a section from declarative `(key, default, comment)` entries,
    /// typically read from a configuration file.
    pub fn from_declarations(
        name: impl Into<String>,
        comment: Option<String>,
        declarations: impl IntoIterator<Item = SettingDeclaration>,
    ) -> Self {
        let mut section = Self::new(name);
        section.comment = comment;
        for declaration in declarations {
            let _ = section.insert(declaration.into_setting());
        }
        section
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.iter().any(|s| s.key() == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|s| s.key())
    }

    pub fn settings(&self) -> impl Iterator<Item = &dyn AnySetting> {
        self.settings.iter().map(|s| s.as_ref())
    }

    pub fn setting(&self, key: &str) -> Option<&dyn AnySetting> {
        self.settings
            .iter()
            .find(|s| s.key() == key)
            .map(|s| s.as_ref())
    }

    /// Registers a new setting.
    ///
    /// Fails with [`Error::DuplicateKey`] (and logs a warning) if `key` is
    /// already present; the existing setting is kept.
    pub fn add_setting<T: SettingValue>(
        &mut self,
        key: impl Into<String>,
        comment: Option<&str>,
        notification_id: Option<i32>,
        default: T,
    ) -> Result<()> {
        let mut setting = Setting::new(key, default);
        if let Some(comment) = comment {
            setting = setting.with_comment(comment);
        }
        if let Some(id) = notification_id {
            setting = setting.with_notification_id(id);
        }
        self.insert(Box::new(setting))
    }

    fn insert(&mut self, setting: Box<dyn AnySetting>) -> Result<()> {
        if self.contains(setting.key()) {
            warn!(
                section = %self.name,
                key = %setting.key(),
                "setting already registered; ignoring duplicate"
            );
            return Err(Error::DuplicateKey {
                section: self.name.clone(),
                key: setting.key().to_string(),
            });
        }
        self.settings.push(setting);
        Ok(())
    }

    pub fn typed<T: SettingValue>(&self, key: &str) -> Result<&Setting<T>> {
        let setting = self
            .settings
            .iter()
            .find(|s| s.key() == key)
            .ok_or_else(|| self.unknown_key(key))?;

        let actual = setting.kind();
        setting
            .as_any()
            .downcast_ref::<Setting<T>>()
            .ok_or_else(|| self.type_mismatch(key, T::KIND, actual))
    }

    pub fn typed_mut<T: SettingValue>(&mut self, key: &str) -> Result<&mut Setting<T>> {
        let Some(index) = self.settings.iter().position(|s| s.key() == key) else {
            return Err(self.unknown_key(key));
        };

        let actual = self.settings[index].kind();
        if actual != T::KIND {
            return Err(self.type_mismatch(key, T::KIND, actual));
        }

        self.settings[index]
            .as_any_mut()
            .downcast_mut::<Setting<T>>()
            .ok_or_else(|| Error::TypeMismatch {
                section: self.name.clone(),
                key: key.to_string(),
                expected: T::KIND,
                actual,
            })
    }

    pub fn get<T: SettingValue>(&self, key: &str) -> Result<T> {
        self.typed::<T>(key).map(Setting::get)
    }

    /// Sets the current value of `key`, returning the previous value.
    pub fn set<T: SettingValue>(&mut self, key: &str, value: T) -> Result<T> {
        self.typed_mut::<T>(key).map(|setting| setting.set(value))
    }

    /// Current values as text, in registration order.
    pub fn serialize(&self) -> Vec<(String, String)> {
        self.settings
            .iter()
            .map(|s| (s.key().to_string(), s.serialize()))
            .collect()
    }

    /// Hydrates settings from persisted text.
    ///
    /// Keys unknown to this section are dropped. Keys missing from `data`
    /// keep their value. Values that fail to parse keep their prior value.
    pub fn deserialize(&mut self, data: &BTreeMap<String, String>) {
        for (key, raw) in data {
            let Some(setting) = self.settings.iter_mut().find(|s| s.key() == key) else {
                debug!(section = %self.name, key = %key, "dropping unknown setting");
                continue;
            };

            if !setting.deserialize(raw) {
                debug!(
                    section = %self.name,
                    key = %key,
                    value = %raw,
                    kind = %setting.kind(),
                    "unparsable value; keeping previous"
                );
            }
        }
    }

    /// Hook for consumers of this section. The section itself has nothing
    /// to push anywhere; the owning store announces the apply.
    pub fn apply(&self) {
        debug!(section = %self.name, settings = self.settings.len(), "applying section");
    }

    pub fn revert(&mut self) {
        self.settings.iter_mut().for_each(|s| s.revert());
    }

    pub fn reset_to_defaults(&mut self) {
        self.settings.iter_mut().for_each(|s| s.reset_to_default());
    }

    pub fn mark_all_saved(&mut self) {
        self.settings.iter_mut().for_each(|s| s.mark_saved());
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.settings.iter().any(|s| s.is_unsaved())
    }

    /// Per-key documentation for human-readable backends.
    pub fn comments(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .filter_map(|s| Some((s.key().to_string(), s.comment()?.to_string())))
            .collect()
    }

    fn unknown_key(&self, key: &str) -> Error {
        debug!(section = %self.name, key = %key, "setting not found");
        Error::UnknownKey {
            section: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn type_mismatch(&self, key: &str, expected: ValueKind, actual: ValueKind) -> Error {
        warn!(
            section = %self.name,
            key = %key,
            %expected,
            %actual,
            "setting accessed with the wrong value type"
        );
        Error::TypeMismatch {
            section: self.name.clone(),
            key: key.to_string(),
            expected,
            actual,
        }
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("comment", &self.comment)
            .field("settings", &self.serialize())
            .finish()
    }
}

/// A default value of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
}

impl DefaultValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            DefaultValue::String(_) => ValueKind::String,
            DefaultValue::Int(_) => ValueKind::Int,
            DefaultValue::Float(_) => ValueKind::Float,
            DefaultValue::Bool(_) => ValueKind::Bool,
        }
    }

    /// Parses `raw` as a value of `kind` with the lenient setting parsers.
    pub fn parse(kind: ValueKind, raw: &str) -> Option<Self> {
        Some(match kind {
            ValueKind::String => DefaultValue::String(String::decode(raw)?),
            ValueKind::Int => DefaultValue::Int(i32::decode(raw)?),
            ValueKind::Float => DefaultValue::Float(f32::decode(raw)?),
            ValueKind::Bool => DefaultValue::Bool(bool::decode(raw)?),
        })
    }

    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => DefaultValue::String(String::new()),
            ValueKind::Int => DefaultValue::Int(0),
            ValueKind::Float => DefaultValue::Float(0.0),
            ValueKind::Bool => DefaultValue::Bool(false),
        }
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::String(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Int(value)
    }
}

impl From<f32> for DefaultValue {
    fn from(value: f32) -> Self {
        DefaultValue::Float(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

/// One entry of a declaratively built section.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDeclaration {
    pub key: String,
    pub default: DefaultValue,
    pub comment: Option<String>,
    pub notification_id: Option<i32>,
}

impl SettingDeclaration {
    pub fn new(key: impl Into<String>, default: impl Into<DefaultValue>) -> Self {
        Self {
            key: key.into(),
            default: default.into(),
            comment: None,
            notification_id: None,
        }
    }

    /// Declares a setting whose default is given as text.
    ///
    /// A default that does not parse as `kind` falls back to the kind's zero
    /// value and is logged.
    pub fn parse(key: impl Into<String>, kind: ValueKind, default: &str) -> Self {
        let key = key.into();
        let default = DefaultValue::parse(kind, default).unwrap_or_else(|| {
            warn!(key = %key, %kind, value = %default, "invalid default; using zero value");
            DefaultValue::zero(kind)
        });
        Self::new(key, default)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_notification_id(mut self, id: i32) -> Self {
        self.notification_id = Some(id);
        self
    }

    fn into_setting(self) -> Box<dyn AnySetting> {
        fn finish<T: SettingValue>(
            key: String,
            default: T,
            comment: Option<String>,
            notification_id: Option<i32>,
        ) -> Box<dyn AnySetting> {
            let mut setting = Setting::new(key, default);
            if let Some(comment) = comment {
                setting = setting.with_comment(comment);
            }
            if let Some(id) = notification_id {
                setting = setting.with_notification_id(id);
            }
            Box::new(setting)
        }

        let Self {
            key,
            default,
            comment,
            notification_id,
        } = self;
        match default {
            DefaultValue::String(v) => finish(key, v, comment, notification_id),
            DefaultValue::Int(v) => finish(key, v, comment, notification_id),
            DefaultValue::Float(v) => finish(key, v, comment, notification_id),
            DefaultValue::Bool(v) => finish(key, v, comment, notification_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn duplicate_key_is_logged_and_skipped() {
        let mut section = Section::new("Audio");
        section
            .add_setting("MasterVolume", None, None, 1.0f32)
            .unwrap();

        let result = section.add_setting("MasterVolume", None, None, true);
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
        assert_eq!(section.len(), 1);
        assert_eq!(section.get::<f32>("MasterVolume").unwrap(), 1.0);
        assert!(logs_contain("setting already registered"));
    }

    #[test]
    #[traced_test]
    fn wrong_type_access_is_logged() {
        let mut section = Section::new("Video").with_setting("Fullscreen", None, true);

        let result = section.set("Fullscreen", 1i32);
        assert!(matches!(
            result,
            Err(Error::TypeMismatch {
                expected: ValueKind::Int,
                actual: ValueKind::Bool,
                ..
            })
        ));
        assert!(section.get::<bool>("Fullscreen").unwrap());
        assert!(!section.has_unsaved_changes());
        assert!(logs_contain("wrong value type"));
    }

    #[test]
    fn declaration_with_bad_default_uses_zero() {
        let declaration = SettingDeclaration::parse("Speed", ValueKind::Float, "fast");
        assert_eq!(declaration.default, DefaultValue::Float(0.0));

        let declaration = SettingDeclaration::parse("Speed", ValueKind::Float, "2.5");
        assert_eq!(declaration.default, DefaultValue::Float(2.5));
    }
}
