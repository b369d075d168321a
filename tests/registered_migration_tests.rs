//! Migrations declared with `submit_migration!` are collected at start-up.

use game_settings::{
    CURRENT_VERSION, Document, Error, Migration, Migrator, PlatformCapabilities, Settings,
    SettingsOptionsBuilder, StorageMode, submit_migration,
};
use std::fs;

struct RenameMasterVolume;

impl Migration for RenameMasterVolume {
    const TARGET: u32 = 1;

    fn migrate(document: &mut Document) -> Result<(), Error> {
        document.rename_key("Audio", "Volume", "MasterVolume");
        Ok(())
    }
}

submit_migration!(RenameMasterVolume);

#[test]
fn test_registered_migrations_are_collected() {
    let migrator = Migrator::new().with_registered();
    assert!(migrator.has_step(RenameMasterVolume::TARGET));
    assert_eq!(migrator.current_version(), CURRENT_VERSION);
}

#[test]
fn test_settings_apply_registered_migrations_on_load() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("settings.ini");
    fs::write(&path, "[Audio]\nVolume=0.25\n").expect("Failed to write settings file");

    let options = SettingsOptionsBuilder::default()
        .app_name("MyGame")
        .storage_mode(StorageMode::StructuredText)
        .capabilities(PlatformCapabilities::new(true))
        .file_path(&path)
        .build()
        .expect("Failed to build options");
    let settings = Settings::new(options).expect("Failed to create settings");

    assert_eq!(settings.get::<f32>("Audio", "MasterVolume").unwrap(), 0.25);

    let rewritten = fs::read_to_string(&path).expect("Failed to read settings file");
    assert!(rewritten.contains(&format!("; Version: {CURRENT_VERSION}")));
    assert!(rewritten.contains("MasterVolume=0.25"));
}
