//! Sectioned application settings with dirty tracking, pluggable
//! persistence and schema migrations.
//!
//! - [`Setting`] / [`Section`]: typed values grouped under a name, each
//!   tracking default, current and last-saved state.
//! - [`Backend`]: an INI-style file ([`IniBackend`]) or an opaque
//!   key-value store ([`KeyValueBackend`]).
//! - [`Migrator`]: version-indexed upgrades of persisted data.
//! - [`Settings`]: the store that ties them together.

pub mod atomic;
pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod migration;
pub mod section;
pub mod setting;
pub mod settings;

pub use backend::{
    Backend, IniBackend, KeyValueBackend, KeyValueStore, MemoryStore, PlatformCapabilities,
    StorageMode, TomlFileStore,
};
pub use config::SettingsConfig;
pub use document::{Document, META_SECTION, VERSION_KEY};
pub use error::{Error, Result};
pub use event::{SettingChange, SettingsEvent, SubscriptionId};
pub use migration::{CURRENT_VERSION, Migration, Migrator, RegisteredMigration};
pub use section::{DefaultValue, Section, SettingDeclaration};
pub use setting::{AnySetting, Setting, SettingValue, ValueKind};
pub use settings::{Lifecycle, Settings, SettingsOptions, SettingsOptionsBuilder};

#[doc(hidden)]
pub use inventory;
