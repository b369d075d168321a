//! Persistence backends.
//!
//! A backend translates between [`Section`]s and the flat [`Document`]
//! shape. Two are provided:
//!
//! - [`IniBackend`]: a human-readable `[Section]` / `key=value` text file.
//! - [`KeyValueBackend`]: entries in an opaque [`KeyValueStore`], for
//!   targets without a dependable filesystem.
//!
//! [`create_backend`] picks one from a [`StorageMode`] and the platform's
//! [`PlatformCapabilities`].

mod ini;
mod kv;
mod select;
mod store;

pub use ini::IniBackend;
pub use kv::KeyValueBackend;
pub use select::{
    PlatformCapabilities, StorageMode, create_backend, default_settings_path, resolve_mode,
};
pub use store::{KeyValueStore, MemoryStore, TomlFileStore};

use crate::{document::Document, error::Result, section::Section};

/// Durable storage for a set of sections.
pub trait Backend: Send {
    /// Whether anything has been persisted yet.
    fn exists(&self) -> bool;

    /// Reads everything persisted. Nothing persisted yet is an empty document.
    fn load(&self) -> Result<Document>;

    /// Replaces the persisted state with `sections`, in the given order.
    fn save(&mut self, sections: &[&Section]) -> Result<()>;

    /// Removes everything this backend persisted. Already-missing entries
    /// are not an error.
    fn delete(&mut self) -> Result<()>;

    /// Where the data lives, for diagnostics.
    fn path(&self) -> String;

    fn mode(&self) -> StorageMode;
}
