use game_settings::{
    Document, Migration, PlatformCapabilities, Settings, SettingsOptionsBuilder, StorageMode,
    error::Error, submit_migration,
};

/// Version 0 files stored the master volume as `Volume` and a percentage.
struct VolumeToMasterVolume;

impl Migration for VolumeToMasterVolume {
    const TARGET: u32 = 1;

    fn migrate(document: &mut Document) -> Result<(), Error> {
        let Some(raw) = document.remove("Audio", "Volume") else {
            return Ok(());
        };
        let percent: f32 = raw.trim().parse().map_err(|_| Error::Migration {
            version: Self::TARGET,
            message: format!("Volume is not a number: {raw}"),
        })?;
        document.insert("Audio", "MasterVolume", (percent / 100.0).to_string());
        Ok(())
    }
}

submit_migration!(VolumeToMasterVolume);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let settings_path = temp_dir.path().join("settings.ini");

    // A file written before the Meta section existed
    let v0_settings = "\
[Audio]
Volume=40
Muted=0

[Video]
Fullscreen=0
";

    println!("Before migration:");
    println!("{}", v0_settings);
    std::fs::write(&settings_path, v0_settings)?;

    // Loading runs the registered migration and writes the result back
    let options = SettingsOptionsBuilder::default()
        .app_name("MyGame")
        .storage_mode(StorageMode::StructuredText)
        .capabilities(PlatformCapabilities::new(true))
        .file_path(&settings_path)
        .build()?;
    let settings = Settings::new(options)?;

    println!(
        "MasterVolume: {}",
        settings.get::<f32>("Audio", "MasterVolume")?
    );
    println!("Fullscreen: {}", settings.get::<bool>("Video", "Fullscreen")?);

    println!("After migration:");
    println!("{}", std::fs::read_to_string(&settings_path)?);

    Ok(())
}
