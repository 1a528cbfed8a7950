//! Channel definitions and the artifacts recorded from them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::DeviceSelector;
use crate::conversion::{OutputFormat, TrackedFile};

pub const DEFAULT_PRESET: &str = "Default";

/// A user-configured recording channel. Frozen for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(flatten)]
    pub device: DeviceSelector,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_preset")]
    pub preset: String,
}

fn default_enabled() -> bool {
    true
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, device: DeviceSelector, format: OutputFormat) -> Self {
        Self {
            name: name.into(),
            device,
            enabled: true,
            format,
            preset: default_preset(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }
}

/// A recorded file tracked from capture through conversion and relocation.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub channel: Arc<ChannelSpec>,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl OutputArtifact {
    pub fn new(channel: Arc<ChannelSpec>, path: PathBuf) -> Self {
        Self {
            channel,
            path,
            size_bytes: 0,
        }
    }

    pub fn target_format(&self) -> OutputFormat {
        self.channel.format
    }

    pub fn needs_conversion(&self) -> bool {
        !self.channel.format.is_raw()
    }

    /// Re-reads the file length; keeps the last known size if the file is gone.
    pub fn refresh_size(&mut self) -> u64 {
        if let Ok(meta) = std::fs::metadata(&self.path) {
            self.size_bytes = meta.len();
        }
        self.size_bytes
    }

    pub fn tracked(&self) -> TrackedFile {
        TrackedFile::new(&self.path, self.size_bytes)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn folder(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Human readable size with one decimal, e.g. `1.5MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut place = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && place < UNITS.len() - 1 {
        value /= 1024.0;
        place += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    format!("{}{}", rounded, UNITS[place])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5MB");
    }

    #[test]
    fn test_channel_spec_toml_roundtrip_defaults() {
        let parsed: ChannelSpec = toml::from_str(
            r#"
name = "Desktop"
device_name = "Speakers"
format = "mp3"
"#,
        )
        .unwrap();
        assert!(parsed.enabled);
        assert_eq!(parsed.preset, DEFAULT_PRESET);
        assert_eq!(parsed.device, DeviceSelector::by_name("Speakers"));
        assert_eq!(parsed.format, OutputFormat::Mp3);
    }

    #[test]
    fn test_refresh_size_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        std::fs::write(&path, vec![0u8; 42]).unwrap();
        let spec = Arc::new(ChannelSpec::new("a", DeviceSelector::by_id("x"), OutputFormat::Wav));
        let mut artifact = OutputArtifact::new(spec, path.clone());
        assert_eq!(artifact.refresh_size(), 42);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(artifact.refresh_size(), 42);
        assert!(!artifact.needs_conversion());
    }
}
