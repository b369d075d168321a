use std::{fmt::Write as _, path::PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use super::{Backend, StorageMode};
use crate::{
    atomic::AtomicFile,
    document::{Document, META_SECTION, VERSION_KEY},
    error::Result,
    migration::CURRENT_VERSION,
    section::Section,
};

/// Settings stored as an INI-style text file.
///
/// ```text
/// ; MyGame Settings
/// ; Generated: 2024-05-01 12:00:00
/// ; Version: 1
///
/// ; === Audio settings ===
/// [Audio]
/// ; Overall output volume
/// MasterVolume=0.8
/// ```
///
/// Values are written raw. Keys and section names must not contain `=`,
/// `[`, `]` or line breaks.
#[derive(Debug, Clone)]
pub struct IniBackend {
    file: AtomicFile,
    app_name: String,
}

impl IniBackend {
    pub fn new(path: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            file: AtomicFile::new(path),
            app_name: app_name.into(),
        }
    }

    pub fn file_path(&self) -> &std::path::Path {
        self.file.path()
    }
}

impl Backend for IniBackend {
    fn exists(&self) -> bool {
        self.file.exists()
    }

    fn load(&self) -> Result<Document> {
        match self.file.read()? {
            Some(text) => {
                let document = parse(&text);
                debug!(
                    path = %self.path(),
                    sections = document.section_names().count(),
                    "loaded settings file"
                );
                Ok(document)
            }
            None => {
                debug!(path = %self.path(), "no settings file yet");
                Ok(Document::new())
            }
        }
    }

    fn save(&mut self, sections: &[&Section]) -> Result<()> {
        let text = render(&self.app_name, sections, Local::now());
        self.file.write(&text).inspect_err(|err| {
            error!(path = %self.path(), error = %err, "failed to write settings file");
        })?;
        info!(path = %self.path(), sections = sections.len(), "saved settings file");
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        if self.file.remove()? {
            info!(path = %self.path(), "deleted settings file");
        }
        Ok(())
    }

    fn path(&self) -> String {
        self.file.path().display().to_string()
    }

    fn mode(&self) -> StorageMode {
        StorageMode::StructuredText
    }
}

pub(crate) fn render(app_name: &str, sections: &[&Section], generated: DateTime<Local>) -> String {
    let version = sections
        .iter()
        .find(|s| s.name() == META_SECTION)
        .and_then(|meta| meta.get::<i32>(VERSION_KEY).ok())
        .map_or_else(|| CURRENT_VERSION.to_string(), |v| v.to_string());

    let mut out = String::new();
    let _ = writeln!(out, "; {app_name} Settings");
    let _ = writeln!(out, "; Generated: {}", generated.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "; Version: {version}");
    out.push('\n');

    for section in sections {
        if let Some(comment) = section.comment() {
            let _ = writeln!(out, "; === {comment} ===");
        }
        let _ = writeln!(out, "[{}]", section.name());

        let comments = section.comments();
        let mut values = section.serialize();
        values.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in values {
            if let Some(comment) = comments.get(&key) {
                let _ = writeln!(out, "; {comment}");
            }
            let _ = writeln!(out, "{key}={value}");
        }
        out.push('\n');
    }

    out
}

pub(crate) fn parse(text: &str) -> Document {
    let mut document = Document::new();
    let mut current: Option<String> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            current = match section_header(line) {
                Some(name) => {
                    document.ensure_section(name);
                    Some(name.to_string())
                }
                None => {
                    debug!(line = number + 1, "ignoring malformed section header");
                    None
                }
            };
            continue;
        }

        let Some(section) = current.as_deref() else {
            debug!(line = number + 1, "ignoring line outside any section");
            continue;
        };

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                document.insert(section, key.trim(), value.trim());
            }
            _ => debug!(line = number + 1, "ignoring malformed line"),
        }
    }

    document
}

/// Name of a `[Section]` line, which may carry a trailing `; comment`.
fn section_header(line: &str) -> Option<&str> {
    let (header, rest) = line.strip_prefix('[')?.split_once(']')?;
    let rest = rest.trim_start();
    if !rest.is_empty() && !rest.starts_with(';') {
        return None;
    }

    let name = header.trim();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_skips_noise_and_keeps_equals_in_values() {
        let text = "\
orphan=1
; comment
[ Audio ]
 MasterVolume = 0.5
Url=http://host/?a=b
not a pair
=nokey

[Video]
Fullscreen=1
[]
Ignored=1
";
        let doc = parse(text);

        assert_eq!(doc.get("Audio", "MasterVolume"), Some("0.5"));
        assert_eq!(doc.get("Audio", "Url"), Some("http://host/?a=b"));
        assert_eq!(doc.get("Video", "Fullscreen"), Some("1"));
        assert_eq!(doc.section("Audio").unwrap().len(), 2);
        assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["Audio", "Video"]);
        assert!(doc.section("Video").unwrap().get("Ignored").is_none());
    }

    #[test]
    fn hash_is_an_ordinary_key_character() {
        let ui = Section::new("Ui").with_setting("#Accent", None, "red".to_string());
        let generated = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let doc = parse(&render("MyGame", &[&ui], generated));

        assert_eq!(doc.get("Ui", "#Accent"), Some("red"));
    }

    #[test]
    fn header_with_trailing_comment_starts_its_section() {
        let doc = parse("[Audio]\nMuted=1\n[Video] ; display\nFullscreen=0\n");

        assert_eq!(doc.get("Audio", "Muted"), Some("1"));
        assert_eq!(doc.get("Video", "Fullscreen"), Some("0"));
        assert!(doc.get("Audio", "Fullscreen").is_none());
    }

    #[test]
    fn malformed_header_ends_the_previous_section() {
        let doc = parse("[Audio]\nMuted=1\n[Video] trailing\nFullscreen=0\n[Controls\nInvertY=1\n");

        assert_eq!(doc.section("Audio").unwrap().len(), 1);
        assert!(doc.section("Video").is_none());
        assert!(doc.section("Controls").is_none());
        assert_eq!(doc.section_names().count(), 1);
    }

    #[test]
    fn render_sorts_keys_and_writes_comments() {
        let audio = Section::new("Audio")
            .with_comment("Audio settings")
            .with_setting("Muted", None, false)
            .with_setting("MasterVolume", Some("Overall output volume"), 0.8f32);
        let generated = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let text = render("MyGame", &[&audio], generated);

        let expected = format!(
            "\
; MyGame Settings
; Generated: 2024-05-01 12:00:00
; Version: {CURRENT_VERSION}

; === Audio settings ===
[Audio]
; Overall output volume
MasterVolume=0.8
Muted=0

"
        );
        assert_eq!(text, expected);
    }
}
