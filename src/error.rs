use thiserror::Error;

use crate::setting::ValueKind;
use crate::settings::SettingsOptionsBuilderError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML Serialization: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("TOML Deserialization: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings options: {0}")]
    Options(#[from] SettingsOptionsBuilderError),

    /// A setting with the same key already exists in the section.
    ///
    /// The second registration is skipped; the first one stays in place.
    #[error("Setting `{key}` already registered in section `{section}`")]
    DuplicateKey { section: String, key: String },

    #[error("Section not registered: {0}")]
    UnknownSection(String),

    #[error("Setting `{key}` not found in section `{section}`")]
    UnknownKey { section: String, key: String },

    /// A typed accessor asked for a different value type than the one the
    /// setting was registered with.
    #[error("Setting `{section}.{key}` holds {actual} values, not {expected}")]
    TypeMismatch {
        section: String,
        key: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The section name is owned by the store itself (see [`META_SECTION`](crate::META_SECTION)).
    #[error("Section name is reserved: {0}")]
    ReservedSection(String),

    /// Two values would be written to the same key-value store entry, such
    /// as a setting named `Keys` and its section's key list.
    ///
    /// Nothing is written when this is returned.
    #[error("Store entry `{entry}` would hold both `{first}` and `{second}`")]
    EntryCollision {
        entry: String,
        first: String,
        second: String,
    },

    #[error("Migration to version {0} is already registered")]
    DuplicateMigration(u32),

    /// Returned by migration steps to reject a document they cannot upgrade.
    #[error("Migration to version {version} failed: {message}")]
    Migration { version: u32, message: String },
}
