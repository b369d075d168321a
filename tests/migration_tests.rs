//! Integration tests for schema migrations.

use game_settings::{
    Document, Error, IniBackend, META_SECTION, Migrator, PlatformCapabilities, Settings,
    SettingsConfig, VERSION_KEY,
};
use std::fs;
use tempfile::TempDir;

/// Helper to create a temporary directory for tests
fn temp_settings_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn rename_volume(doc: &mut Document) -> Result<(), Error> {
    doc.rename_key("Audio", "Volume", "MasterVolume");
    Ok(())
}

fn legacy_document() -> Document {
    let mut doc = Document::new();
    doc.insert(META_SECTION, VERSION_KEY, "0");
    doc.insert("Audio", "Volume", "0.4");
    doc.insert("Video", "Fullscreen", "0");
    doc
}

#[test]
fn test_rename_key_migration() {
    let mut migrator = Migrator::with_current_version(1);
    migrator
        .register(1, rename_volume)
        .expect("Failed to register migration");

    let migrated = migrator.migrate(legacy_document(), 0);

    let audio = migrated.section("Audio").expect("Audio section missing");
    assert_eq!(audio.get("MasterVolume").map(String::as_str), Some("0.4"));
    assert!(!audio.contains_key("Volume"));
    assert_eq!(migrated.get("Video", "Fullscreen"), Some("0"));
    assert_eq!(Migrator::extract_version(&migrated), 1);
}

#[test]
fn test_migration_is_noop_for_current_or_newer_versions() {
    let mut migrator = Migrator::with_current_version(2);
    migrator
        .register(2, |doc| {
            doc.insert("Audio", "Touched", "1");
            Ok(())
        })
        .expect("Failed to register migration");

    for version in [2, 3, 10] {
        let mut doc = legacy_document();
        doc.set_version(version);

        let migrated = migrator.migrate(doc.clone(), version);
        assert_eq!(migrated, doc, "version {version} should be left alone");
    }
}

#[test]
fn test_migrated_version_never_goes_backwards() {
    let mut migrator = Migrator::with_current_version(3);
    migrator.register(1, rename_volume).unwrap();
    migrator
        .register(2, |_| {
            Err(Error::Migration {
                version: 2,
                message: "boom".to_string(),
            })
        })
        .unwrap();

    for version in 0..=3 {
        let mut doc = legacy_document();
        doc.set_version(version);

        let migrated = migrator.migrate(doc, version);
        assert!(
            Migrator::extract_version(&migrated) >= version,
            "migrating from {version} went backwards"
        );
    }
}

#[test]
fn test_failed_step_keeps_previous_document_and_continues() {
    let mut migrator = Migrator::with_current_version(3);
    migrator.register(1, rename_volume).unwrap();
    migrator
        .register(2, |doc| {
            // Partially edits the document before failing.
            doc.remove_section("Video");
            Err(Error::Migration {
                version: 2,
                message: "unsupported layout".to_string(),
            })
        })
        .unwrap();
    migrator
        .register(3, |doc| {
            doc.insert("Gameplay", "Difficulty", "2");
            Ok(())
        })
        .unwrap();

    let migrated = migrator.migrate(legacy_document(), 0);

    assert_eq!(migrated.get("Audio", "MasterVolume"), Some("0.4"));
    assert_eq!(
        migrated.get("Video", "Fullscreen"),
        Some("0"),
        "edits of the failed step must be discarded"
    );
    assert_eq!(migrated.get("Gameplay", "Difficulty"), Some("2"));
    assert_eq!(migrated.version(), 3);
}

#[test]
fn test_rename_step_is_safe_on_already_migrated_data() {
    let mut migrator = Migrator::with_current_version(1);
    migrator.register(1, rename_volume).unwrap();

    let mut doc = Document::new();
    doc.insert("Audio", "MasterVolume", "0.7");

    let migrated = migrator.migrate(doc, 0);
    assert_eq!(migrated.get("Audio", "MasterVolume"), Some("0.7"));
}

#[test]
fn test_missing_version_is_treated_as_zero() {
    let mut doc = Document::new();
    doc.insert("Audio", "Volume", "0.4");
    assert_eq!(Migrator::extract_version(&doc), 0);

    doc.insert(META_SECTION, VERSION_KEY, "not a number");
    assert_eq!(Migrator::extract_version(&doc), 0);
}

#[test]
fn test_load_migrates_file_and_writes_it_back() {
    let temp_dir = temp_settings_dir();
    let path = temp_dir.path().join("settings.ini");

    let legacy = "\
[Meta]
Version=0

[Audio]
Volume=0.4
Muted=1
";
    fs::write(&path, legacy).expect("Failed to write settings file");

    let mut migrator = Migrator::with_current_version(1);
    migrator.register(1, rename_volume).unwrap();

    let settings = Settings::with_backend(
        Box::new(IniBackend::new(&path, "MyGame")),
        "MyGame",
        PlatformCapabilities::new(true),
        &SettingsConfig::default(),
        migrator,
    );

    assert_eq!(settings.get::<f32>("Audio", "MasterVolume").unwrap(), 0.4);
    assert!(settings.get::<bool>("Audio", "Muted").unwrap());
    assert!(!settings.has_unsaved_changes());

    let rewritten = fs::read_to_string(&path).expect("Failed to read settings file");
    assert!(rewritten.contains("MasterVolume=0.4"));
    assert!(!rewritten.lines().any(|line| line.starts_with("Volume=")));
    assert!(rewritten.contains("[Meta]\nVersion=1\n"));
}
