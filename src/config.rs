//! Default values for the built-in sections and declarations of custom ones.
//!
//! [`SettingsConfig`] is plain data. Hosts embed it, build it in code, or
//! read it from TOML:
//!
//! ```toml
//! [audio]
//! master_volume = 0.9
//!
//! [[custom_sections]]
//! name = "Accessibility"
//! comment = "Accessibility options"
//!
//! [[custom_sections.settings]]
//! key = "TextScale"
//! kind = "float"
//! default = "1.25"
//! comment = "UI text scale"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    section::{Section, SettingDeclaration},
    setting::ValueKind,
};

pub const AUDIO_SECTION: &str = "Audio";
pub const VIDEO_SECTION: &str = "Video";
pub const CONTROLS_SECTION: &str = "Controls";
pub const GAMEPLAY_SECTION: &str = "Gameplay";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub audio: AudioDefaults,
    pub video: VideoDefaults,
    pub controls: ControlsDefaults,
    pub gameplay: GameplayDefaults,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_sections: Vec<CustomSectionConfig>,
}

impl SettingsConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Built-in sections followed by custom ones, in declaration order.
    pub fn build_sections(&self) -> Vec<Section> {
        let mut sections = vec![
            self.audio.to_section(),
            self.video.to_section(),
            self.controls.to_section(),
            self.gameplay.to_section(),
        ];
        sections.extend(self.custom_sections.iter().map(CustomSectionConfig::to_section));
        sections
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioDefaults {
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub voice_volume: f32,
    pub muted: bool,
}

impl Default for AudioDefaults {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            music_volume: 0.8,
            sfx_volume: 1.0,
            voice_volume: 1.0,
            muted: false,
        }
    }
}

impl AudioDefaults {
    pub fn to_section(&self) -> Section {
        Section::new(AUDIO_SECTION)
            .with_comment("Audio settings")
            .with_setting("MasterVolume", Some("Overall output volume (0-1)"), self.master_volume)
            .with_setting("MusicVolume", Some("Music volume (0-1)"), self.music_volume)
            .with_setting("SfxVolume", Some("Sound effects volume (0-1)"), self.sfx_volume)
            .with_setting("VoiceVolume", Some("Dialogue volume (0-1)"), self.voice_volume)
            .with_setting("Muted", Some("Mute all audio"), self.muted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDefaults {
    pub resolution_width: i32,
    pub resolution_height: i32,
    pub fullscreen: bool,
    pub vsync: bool,
    pub quality_level: i32,
    pub target_frame_rate: i32,
    pub brightness: f32,
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            resolution_width: 1920,
            resolution_height: 1080,
            fullscreen: true,
            vsync: true,
            quality_level: 2,
            target_frame_rate: 60,
            brightness: 1.0,
        }
    }
}

impl VideoDefaults {
    pub fn to_section(&self) -> Section {
        Section::new(VIDEO_SECTION)
            .with_comment("Video settings")
            .with_setting("ResolutionWidth", Some("Horizontal resolution"), self.resolution_width)
            .with_setting("ResolutionHeight", Some("Vertical resolution"), self.resolution_height)
            .with_setting("Fullscreen", None, self.fullscreen)
            .with_setting("VSync", Some("Wait for vertical sync"), self.vsync)
            .with_setting("QualityLevel", Some("Quality preset index"), self.quality_level)
            .with_setting("TargetFrameRate", Some("-1 for unlimited"), self.target_frame_rate)
            .with_setting("Brightness", None, self.brightness)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsDefaults {
    pub mouse_sensitivity: f32,
    pub invert_y: bool,
    pub controller_vibration: bool,
    /// Serialized rebinding overrides; empty means none.
    pub key_bindings: String,
}

impl Default for ControlsDefaults {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.0,
            invert_y: false,
            controller_vibration: true,
            key_bindings: String::new(),
        }
    }
}

impl ControlsDefaults {
    pub fn to_section(&self) -> Section {
        Section::new(CONTROLS_SECTION)
            .with_comment("Input settings")
            .with_setting("MouseSensitivity", None, self.mouse_sensitivity)
            .with_setting("InvertY", Some("Invert vertical look"), self.invert_y)
            .with_setting("ControllerVibration", None, self.controller_vibration)
            .with_setting("KeyBindings", Some("Rebinding overrides"), self.key_bindings.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayDefaults {
    pub difficulty: i32,
    pub language: String,
    pub show_subtitles: bool,
    pub show_tutorials: bool,
    pub field_of_view: f32,
}

impl Default for GameplayDefaults {
    fn default() -> Self {
        Self {
            difficulty: 1,
            language: "en".to_string(),
            show_subtitles: true,
            show_tutorials: true,
            field_of_view: 90.0,
        }
    }
}

impl GameplayDefaults {
    pub fn to_section(&self) -> Section {
        Section::new(GAMEPLAY_SECTION)
            .with_comment("Gameplay settings")
            .with_setting("Difficulty", Some("0 easy, 1 normal, 2 hard"), self.difficulty)
            .with_setting("Language", None, self.language.clone())
            .with_setting("ShowSubtitles", None, self.show_subtitles)
            .with_setting("ShowTutorials", None, self.show_tutorials)
            .with_setting("FieldOfView", Some("Degrees"), self.field_of_view)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomSectionConfig {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub settings: Vec<CustomSettingConfig>,
}

impl CustomSectionConfig {
    pub fn to_section(&self) -> Section {
        Section::from_declarations(
            self.name.clone(),
            self.comment.clone(),
            self.settings.iter().map(CustomSettingConfig::to_declaration),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSettingConfig {
    pub key: String,
    pub kind: ValueKind,
    /// Default value as text, parsed leniently according to `kind`.
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub notification_id: Option<i32>,
}

impl CustomSettingConfig {
    pub fn to_declaration(&self) -> SettingDeclaration {
        let mut declaration = SettingDeclaration::parse(self.key.clone(), self.kind, &self.default);
        if let Some(comment) = &self.comment {
            declaration = declaration.with_comment(comment.clone());
        }
        if let Some(id) = self.notification_id {
            declaration = declaration.with_notification_id(id);
        }
        declaration
    }
}
