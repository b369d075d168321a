use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Backend, IniBackend, KeyValueBackend, MemoryStore, TomlFileStore};
use crate::{error::Result, settings::SettingsOptions};

/// Requested storage mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageMode {
    /// Structured text where the platform has a filesystem, the key-value
    /// store otherwise.
    #[default]
    Auto,
    KeyValueStore,
    StructuredText,
}

/// What the host platform can do, supplied at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub file_storage: bool,
}

impl PlatformCapabilities {
    pub const fn new(file_storage: bool) -> Self {
        Self { file_storage }
    }

    /// Best guess for the compilation target: browsers and mobile sandboxes
    /// get no persistent filesystem.
    pub fn detect() -> Self {
        let sandboxed = cfg!(any(
            target_arch = "wasm32",
            target_os = "android",
            target_os = "ios"
        ));
        Self::new(!sandboxed)
    }

    pub fn is_file_storage_supported(&self) -> bool {
        self.file_storage
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Resolves [`StorageMode::Auto`]; explicit modes pass through unchanged.
pub fn resolve_mode(requested: StorageMode, capabilities: PlatformCapabilities) -> StorageMode {
    match requested {
        StorageMode::Auto if capabilities.file_storage => StorageMode::StructuredText,
        StorageMode::Auto => StorageMode::KeyValueStore,
        explicit => explicit,
    }
}

/// `<config dir>/<app_name>/settings.ini`, or a file in the working
/// directory when the platform reports no config dir.
pub fn default_settings_path(app_name: &str) -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(app_name).join("settings.ini"),
        None => PathBuf::from(format!("{app_name}-settings.ini")),
    }
}

/// Builds the backend described by `options`.
///
/// In key-value mode without an explicit store, desktop targets get a
/// [`TomlFileStore`] next to where the settings file would live and
/// sandboxed targets an in-process [`MemoryStore`].
pub fn create_backend(options: &mut SettingsOptions) -> Result<Box<dyn Backend>> {
    let capabilities = options.capabilities();
    let mode = resolve_mode(options.storage_mode(), capabilities);
    let path = options
        .file_path()
        .cloned()
        .unwrap_or_else(|| default_settings_path(options.app_name()));

    let backend: Box<dyn Backend> = match mode {
        StorageMode::StructuredText => {
            if !capabilities.file_storage {
                warn!(path = %path.display(), "file storage requested on a platform without it");
            }
            Box::new(IniBackend::new(path, options.app_name()))
        }
        _ => {
            let store = match options.take_kv_store() {
                Some(store) => store,
                None if capabilities.file_storage => {
                    Box::new(TomlFileStore::open(path.with_extension("prefs.toml"))?)
                }
                None => {
                    warn!("no persistent store available; settings are kept in memory only");
                    Box::new(MemoryStore::new())
                }
            };
            Box::new(KeyValueBackend::from_boxed(store, options.key_prefix()))
        }
    };

    info!(?mode, location = %backend.path(), "settings backend selected");
    Ok(backend)
}
