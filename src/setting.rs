//! Typed setting values.
//!
//! A [`Setting<T>`] keeps three copies of its value: the default it was
//! registered with, the current in-memory value, and the value last
//! persisted. A setting is *unsaved* whenever current and saved differ.
//!
//! Sections hold settings of different value types side by side, so they
//! store them as [`AnySetting`] trait objects and downcast on typed access.

use std::{any::Any, fmt};

use serde::{Deserialize, Serialize};

/// The primitive value types a setting can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A value type that can be stored in a [`Setting`].
///
/// `encode` produces the canonical text written to backends; `decode` is
/// deliberately lenient and returns `None` instead of failing loudly.
pub trait SettingValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: ValueKind;

    fn encode(&self) -> String;
    fn decode(raw: &str) -> Option<Self>;
}

impl SettingValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl SettingValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<i32>() {
            return Some(value);
        }

        // Accept integral floats such as "3.0" written by older builds.
        let value = raw.parse::<f64>().ok()?;
        if value.is_finite()
            && value.fract() == 0.0
            && value >= f64::from(i32::MIN)
            && value <= f64::from(i32::MAX)
        {
            Some(value as i32)
        } else {
            None
        }
    }
}

impl SettingValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn encode(&self) -> String {
        // Shortest representation that parses back to the same f32.
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.trim().parse::<f32>().ok()
    }
}

impl SettingValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn encode(&self) -> String {
        let text = if *self { "1" } else { "0" };
        text.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => other.parse::<i64>().ok().map(|n| n != 0),
        }
    }
}

/// A named, typed value with default, current and last-saved states.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting<T: SettingValue> {
    key: String,
    comment: Option<String>,
    notification_id: Option<i32>,
    default: T,
    current: T,
    saved: T,
}

impl<T: SettingValue> Setting<T> {
    /// Creates a setting whose current and saved values both start at `default`.
    pub fn new(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            comment: None,
            notification_id: None,
            current: default.clone(),
            saved: default.clone(),
            default,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_notification_id(mut self, id: i32) -> Self {
        self.notification_id = Some(id);
        self
    }

    pub fn get(&self) -> T {
        self.current.clone()
    }

    pub fn value(&self) -> &T {
        &self.current
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn saved_value(&self) -> &T {
        &self.saved
    }

    pub fn notification_id(&self) -> Option<i32> {
        self.notification_id
    }

    /// Replaces the current value and returns the previous one.
    ///
    /// The saved value is untouched, so the setting becomes unsaved unless
    /// `value` equals what was last persisted.
    pub fn set(&mut self, value: T) -> T {
        std::mem::replace(&mut self.current, value)
    }
}

/// Object-safe view of a [`Setting<T>`] used by sections and backends.
pub trait AnySetting: Send + Sync {
    fn key(&self) -> &str;
    fn comment(&self) -> Option<&str>;
    fn notification_id(&self) -> Option<i32>;
    fn kind(&self) -> ValueKind;

    fn serialize(&self) -> String;

    /// Parses `raw` into the current value. Returns `false` and keeps the
    /// prior value when `raw` does not parse.
    fn deserialize(&mut self, raw: &str) -> bool;

    fn mark_saved(&mut self);
    fn revert(&mut self);
    fn reset_to_default(&mut self);
    fn is_unsaved(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: SettingValue> AnySetting for Setting<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn notification_id(&self) -> Option<i32> {
        self.notification_id
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn serialize(&self) -> String {
        self.current.encode()
    }

    fn deserialize(&mut self, raw: &str) -> bool {
        match T::decode(raw) {
            Some(value) => {
                self.current = value;
                true
            }
            None => false,
        }
    }

    fn mark_saved(&mut self) {
        self.saved = self.current.clone();
    }

    fn revert(&mut self) {
        self.current = self.saved.clone();
    }

    fn reset_to_default(&mut self) {
        self.current = self.default.clone();
    }

    fn is_unsaved(&self) -> bool {
        self.current != self.saved
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
