//! The settings store.
//!
//! This module provides [`Settings`], the single owner of every section,
//! the persistence backend and the migrator. It coordinates the whole
//! life cycle: load on start, typed reads and writes, apply, revert, reset
//! and save.
//!
//! # Overview
//!
//! On construction the store:
//!
//! - Picks a [`Backend`] from the requested [`StorageMode`] and the
//!   platform's [`PlatformCapabilities`]
//! - Builds the built-in and custom sections from a [`SettingsConfig`]
//! - Loads persisted values, migrating them if they were written by an
//!   older schema version
//! - Applies every section once
//!
//! # Example
//!
//! ```rust,no_run
//! use game_settings::{Settings, SettingsOptionsBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SettingsOptionsBuilder::default()
//!         .app_name("MyGame")
//!         .build()?;
//!     let mut settings = Settings::new(options)?;
//!
//!     settings.set("Audio", "MasterVolume", 0.5f32)?;
//!     assert!(settings.section_has_unsaved_changes("Audio"));
//!
//!     settings.save()?;
//!     assert!(!settings.has_unsaved_changes());
//!     Ok(())
//! }
//! ```
use std::path::PathBuf;

use derive_builder::Builder;
use tracing::{debug, error, info, warn};

use crate::{
    backend::{self, Backend, KeyValueStore, PlatformCapabilities, StorageMode, resolve_mode},
    config::SettingsConfig,
    document::{Document, META_SECTION, VERSION_KEY},
    error::{Error, Result},
    event::{EventBus, SettingChange, SettingsEvent, SubscriptionId},
    migration::Migrator,
    section::Section,
    setting::SettingValue,
};

/// Prefix for entries written to a key-value store.
pub const DEFAULT_KEY_PREFIX: &str = "Settings_";

/// How a [`Settings`] store is set up.
///
/// Built with [`SettingsOptionsBuilder`]; only `app_name` is required.
///
/// ```rust
/// use game_settings::{PlatformCapabilities, SettingsOptionsBuilder, StorageMode};
///
/// let options = SettingsOptionsBuilder::default()
///     .app_name("MyGame")
///     .storage_mode(StorageMode::Auto)
///     .capabilities(PlatformCapabilities::new(false))
///     .build()
///     .unwrap();
///
/// assert_eq!(options.resolved_mode(), StorageMode::KeyValueStore);
/// ```
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct SettingsOptions {
    /// Shown in file headers and used for the default file location.
    #[builder(setter(into))]
    app_name: String,

    #[builder(default)]
    storage_mode: StorageMode,

    #[builder(default)]
    capabilities: PlatformCapabilities,

    /// Settings file location; defaults to the platform config directory.
    #[builder(default, setter(into, strip_option))]
    file_path: Option<PathBuf>,

    #[builder(default = "DEFAULT_KEY_PREFIX.to_string()", setter(into))]
    key_prefix: String,

    /// Defaults for the built-in sections and any custom sections.
    #[builder(default)]
    config: SettingsConfig,

    #[builder(setter(skip))]
    kv_store: Option<Box<dyn KeyValueStore>>,
}

impl SettingsOptions {
    /// Uses `store` when the resolved mode is [`StorageMode::KeyValueStore`].
    pub fn with_kv_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.kv_store = Some(Box::new(store));
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    pub fn resolved_mode(&self) -> StorageMode {
        resolve_mode(self.storage_mode, self.capabilities)
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    pub(crate) fn take_kv_store(&mut self) -> Option<Box<dyn KeyValueStore>> {
        self.kv_store.take()
    }
}

/// Where a [`Settings`] store is in its start-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

/// The owner of all settings sections.
///
/// `Settings` is responsible for:
///
/// - Holding every [`Section`] and the reserved `Meta` section
/// - Loading from and saving to its [`Backend`]
/// - Running the [`Migrator`] over stale persisted data
/// - Applying, reverting and resetting sections
/// - Announcing life-cycle milestones through [`SettingsEvent`]s
///
/// # Errors
///
/// Nothing here panics. Every failing operation logs through `tracing` and
/// returns the error, leaving the in-memory state as it was: a failed save
/// does not mark anything saved, a failed load keeps the previous values.
pub struct Settings {
    lifecycle: Lifecycle,
    app_name: String,
    capabilities: PlatformCapabilities,
    backend: Box<dyn Backend>,
    migrator: Migrator,
    meta: Section,
    sections: Vec<Section>,
    last_document: Option<Document>,
    events: EventBus,
}

impl Settings {
    /// Creates a store and runs the start-up sequence.
    ///
    /// Migrations submitted with [`submit_migration!`](crate::submit_migration)
    /// are picked up automatically.
    ///
    /// # Errors
    ///
    /// Fails only if the backend cannot be constructed (for example when a
    /// preference file exists but cannot be read). A failing initial load is
    /// logged and the store starts from defaults.
    pub fn new(options: SettingsOptions) -> Result<Self> {
        Self::with_migrator(options, Migrator::new().with_registered())
    }

    /// Like [`new`](Settings::new) but with an explicit migrator.
    pub fn with_migrator(mut options: SettingsOptions, migrator: Migrator) -> Result<Self> {
        let backend = backend::create_backend(&mut options)?;
        let config = options.config;
        Ok(Self::with_backend(
            backend,
            options.app_name,
            options.capabilities,
            &config,
            migrator,
        ))
    }

    /// Creates a store over a caller-supplied backend.
    pub fn with_backend(
        backend: Box<dyn Backend>,
        app_name: impl Into<String>,
        capabilities: PlatformCapabilities,
        config: &SettingsConfig,
        migrator: Migrator,
    ) -> Self {
        let meta = meta_section(migrator.current_version());
        let mut settings = Self {
            lifecycle: Lifecycle::Uninitialized,
            app_name: app_name.into(),
            capabilities,
            backend,
            migrator,
            meta,
            sections: Vec::new(),
            last_document: None,
            events: EventBus::new(),
        };
        settings.initialize(config);
        settings
    }

    fn initialize(&mut self, config: &SettingsConfig) {
        self.lifecycle = Lifecycle::Initializing;
        debug!(app = %self.app_name, backend = %self.backend.path(), "initializing settings");

        for section in config.build_sections() {
            let _ = self.register_section(section);
        }

        // Already logged; the store keeps running on defaults.
        let _ = self.load();
        self.apply_all();

        self.lifecycle = Lifecycle::Ready;
        info!(app = %self.app_name, sections = self.sections.len(), "settings ready");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.backend.mode()
    }

    pub fn is_file_storage_supported(&self) -> bool {
        self.capabilities.is_file_storage_supported()
    }

    pub fn backend_path(&self) -> String {
        self.backend.path()
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Reloads every section from the backend.
    ///
    /// Stale data is migrated first and, once migrated, written back so
    /// the upgrade only runs once. Sections then take their values from
    /// the document and are marked saved. Sections or keys absent from the
    /// document keep their current values.
    ///
    /// # Errors
    ///
    /// Returns the backend's read error; sections are left untouched.
    pub fn load(&mut self) -> Result<()> {
        let document = self.backend.load().inspect_err(|err| {
            error!(backend = %self.backend.path(), error = %err, "failed to load settings");
        })?;

        let version = Migrator::extract_version(&document);
        let stale = !document.is_empty() && self.migrator.is_stale(version);
        let document = match stale {
            true => {
                info!(from = version, to = self.migrator.current_version(), "migrating settings");
                self.migrator.migrate(document, version)
            }
            false => document,
        };

        for section in &mut self.sections {
            if let Some(data) = document.section(section.name()) {
                section.deserialize(data);
            }
            section.mark_all_saved();
        }
        self.last_document = Some(document);

        if stale {
            if let Err(err) = self.persist() {
                warn!(error = %err, "could not write migrated settings back");
            }
        }

        info!(backend = %self.backend.path(), "settings loaded");
        self.events.emit(&SettingsEvent::Loaded);
        Ok(())
    }

    /// Writes every section to the backend and marks them saved.
    ///
    /// # Errors
    ///
    /// Returns the backend's write error; nothing is marked saved.
    pub fn save(&mut self) -> Result<()> {
        self.persist().inspect_err(|err| {
            error!(backend = %self.backend.path(), error = %err, "failed to save settings");
        })?;
        self.events.emit(&SettingsEvent::Saved);
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        let mut all: Vec<&Section> = Vec::with_capacity(self.sections.len() + 1);
        all.push(&self.meta);
        all.extend(self.sections.iter());
        self.backend.save(&all)?;

        for section in &mut self.sections {
            section.mark_all_saved();
        }
        self.last_document = Some(self.to_document());
        Ok(())
    }

    /// Removes everything the backend persisted. In-memory values are kept.
    pub fn delete_saved_data(&mut self) -> Result<()> {
        self.backend.delete().inspect_err(|err| {
            error!(backend = %self.backend.path(), error = %err, "failed to delete saved settings");
        })?;
        self.last_document = None;
        Ok(())
    }

    /// Current values of every section, including `Meta`, as a document.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for section in std::iter::once(&self.meta).chain(self.sections.iter()) {
            let target = document.ensure_section(section.name());
            target.extend(section.serialize());
        }
        document
    }

    pub fn apply_all(&mut self) {
        self.sections.iter().for_each(Section::apply);
        self.events.emit(&SettingsEvent::Applied { section: None });
    }

    pub fn apply(&mut self, section: &str) -> Result<()> {
        self.find(section)?.apply();
        self.events.emit(&SettingsEvent::Applied {
            section: Some(section.to_string()),
        });
        Ok(())
    }

    /// Restores every section to its last saved values.
    pub fn revert_all(&mut self) {
        self.sections.iter_mut().for_each(Section::revert);
        self.events.emit(&SettingsEvent::Reverted { section: None });
    }

    pub fn revert(&mut self, section: &str) -> Result<()> {
        self.find_mut(section)?.revert();
        self.events.emit(&SettingsEvent::Reverted {
            section: Some(section.to_string()),
        });
        Ok(())
    }

    /// Sets every section back to its defaults. Nothing is saved.
    pub fn reset_all_to_defaults(&mut self) {
        self.sections.iter_mut().for_each(Section::reset_to_defaults);
        self.events.emit(&SettingsEvent::ResetToDefaults { section: None });
    }

    pub fn reset_to_defaults(&mut self, section: &str) -> Result<()> {
        self.find_mut(section)?.reset_to_defaults();
        self.events.emit(&SettingsEvent::ResetToDefaults {
            section: Some(section.to_string()),
        });
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.sections.iter().any(Section::has_unsaved_changes)
    }

    /// `false` for sections that do not exist.
    pub fn section_has_unsaved_changes(&self, section: &str) -> bool {
        self.section(section).is_some_and(Section::has_unsaved_changes)
    }

    /// Adds a section after start-up, or replaces one with the same name.
    ///
    /// The section is hydrated from the last loaded document, if any, and
    /// marked saved.
    ///
    /// # Errors
    ///
    /// [`Error::ReservedSection`] for the name `Meta`.
    pub fn register_section(&mut self, mut section: Section) -> Result<()> {
        if section.name() == META_SECTION {
            warn!(section = %section.name(), "section name is reserved");
            return Err(Error::ReservedSection(section.name().to_string()));
        }

        if let Some(data) = self
            .last_document
            .as_ref()
            .and_then(|doc| doc.section(section.name()))
        {
            section.deserialize(data);
        }
        section.mark_all_saved();

        match self.sections.iter_mut().find(|s| s.name() == section.name()) {
            Some(existing) => {
                warn!(section = %section.name(), "replacing existing section");
                *existing = section;
            }
            None => {
                debug!(section = %section.name(), "section registered");
                self.sections.push(section);
            }
        }
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    /// Direct access to a section. Changes made through it emit no
    /// [`SettingsEvent::Modified`]; prefer [`set`](Settings::set).
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name() == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(Section::name)
    }

    pub fn get<T: SettingValue>(&self, section: &str, key: &str) -> Result<T> {
        self.find(section)?.get(key)
    }

    /// Sets a value and announces the change.
    ///
    /// Emits [`SettingsEvent::Modified`] only when the value actually changes.
    pub fn set<T: SettingValue>(&mut self, section: &str, key: &str, value: T) -> Result<()> {
        let setting = self.find_mut(section)?.typed_mut::<T>(key)?;
        if *setting.value() == value {
            return Ok(());
        }

        let previous = setting.set(value);
        let change = SettingChange {
            section: section.to_string(),
            key: key.to_string(),
            new_value: setting.value().encode(),
            previous_value: previous.encode(),
            notification_id: setting.notification_id(),
        };

        debug!(section, key, value = %change.new_value, "setting modified");
        self.events.emit(&SettingsEvent::Modified(change));
        Ok(())
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&SettingsEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn find(&self, name: &str) -> Result<&Section> {
        self.section(name).ok_or_else(|| {
            warn!(section = %name, "unknown section");
            Error::UnknownSection(name.to_string())
        })
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Section> {
        match self.sections.iter_mut().find(|s| s.name() == name) {
            Some(section) => Ok(section),
            None => {
                warn!(section = %name, "unknown section");
                Err(Error::UnknownSection(name.to_string()))
            }
        }
    }
}

fn meta_section(version: u32) -> Section {
    let version = i32::try_from(version).unwrap_or(i32::MAX);
    Section::new(META_SECTION).with_setting(VERSION_KEY, None, version)
}
