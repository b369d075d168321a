use game_settings::{
    PlatformCapabilities, Section, Settings, SettingsEvent, SettingsOptionsBuilder, StorageMode,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let settings_path = temp_dir.path().join("settings.ini");

    // Nothing is written until the first save
    let options = SettingsOptionsBuilder::default()
        .app_name("MyGame")
        .storage_mode(StorageMode::StructuredText)
        .capabilities(PlatformCapabilities::detect())
        .file_path(&settings_path)
        .build()?;
    let mut settings = Settings::new(options)?;

    settings.subscribe(|event| match event {
        SettingsEvent::Modified(change) => println!(
            "{}.{}: {} -> {}",
            change.section, change.key, change.previous_value, change.new_value
        ),
        other => println!("event: {}", other.name()),
    });

    // Game-specific sections sit next to the built-in ones
    settings.register_section(
        Section::new("Network")
            .with_comment("Online play")
            .with_setting("Region", Some("Preferred matchmaking region"), "auto".to_string())
            .with_setting("Port", None, 7777i32),
    )?;

    settings.set("Audio", "MasterVolume", 0.5f32)?;
    settings.set("Video", "Fullscreen", false)?;
    settings.set("Network", "Region", "eu-west".to_string())?;
    println!("Unsaved changes: {}", settings.has_unsaved_changes());

    settings.save()?;
    println!("Saved to {}:", settings.backend_path());
    println!("{}", std::fs::read_to_string(&settings_path)?);

    // Try something out, then go back to what was saved
    settings.reset_to_defaults("Audio")?;
    println!(
        "MasterVolume after reset: {}",
        settings.get::<f32>("Audio", "MasterVolume")?
    );
    settings.revert("Audio")?;
    println!(
        "MasterVolume after revert: {}",
        settings.get::<f32>("Audio", "MasterVolume")?
    );

    // Asking for the wrong type is an error, not a panic
    match settings.get::<i32>("Audio", "MasterVolume") {
        Ok(value) => println!("Unexpected value: {value}"),
        Err(e) => println!("Lookup failed (expected): {e}"),
    }

    Ok(())
}
