use crate::conversion::EncoderSettings;
use crate::global;
use crate::session::{ChannelSpec, DEFAULT_PRESET};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const TEMP_FOLDER_NAME: &str = "Temp";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only channels tagged with this preset take part in a recording.
    pub selected_preset: String,
    pub storage: StorageConfig,
    pub encoder: EncoderConfig,
    pub channels: Vec<ChannelSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selected_preset: DEFAULT_PRESET.to_string(),
            storage: StorageConfig::default(),
            encoder: EncoderConfig::default(),
            channels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Final home of finished recordings.
    pub output_folder: PathBuf,
    /// Record into `<output_folder>/Temp` and move finished files out of it.
    pub use_temp_folder: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_folder: global::default_output_folder(),
            use_temp_folder: true,
        }
    }
}

impl StorageConfig {
    pub fn temp_folder(&self) -> PathBuf {
        self.output_folder.join(TEMP_FOLDER_NAME)
    }

    /// Where raw files are written while recording.
    pub fn recording_folder(&self) -> PathBuf {
        if self.use_temp_folder {
            self.temp_folder()
        } else {
            self.output_folder.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Explicit ffmpeg binary; when unset it is looked up next to the
    /// executable and then on PATH.
    pub path: Option<PathBuf>,
    pub search_path: bool,
    pub timeout_seconds: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        let defaults = EncoderSettings::default();
        Self {
            path: defaults.path,
            search_path: defaults.search_path,
            timeout_seconds: defaults.timeout.as_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Channels of the selected preset, in configuration order. Disabled
    /// channels are included; the session skips them itself.
    pub fn session_channels(&self) -> Vec<ChannelSpec> {
        self.channels
            .iter()
            .filter(|c| c.preset == self.selected_preset)
            .cloned()
            .collect()
    }

    /// Distinct preset names in first-seen order.
    pub fn presets(&self) -> Vec<String> {
        let mut presets: Vec<String> = Vec::new();
        for channel in &self.channels {
            if !presets.contains(&channel.preset) {
                presets.push(channel.preset.clone());
            }
        }
        presets
    }

    pub fn add_channel(&mut self, channel: ChannelSpec) -> Result<()> {
        if self
            .channels
            .iter()
            .any(|c| c.name == channel.name && c.preset == channel.preset)
        {
            bail!(
                "Channel '{}' already exists in preset '{}'",
                channel.name,
                channel.preset
            );
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Removes `name` from the selected preset.
    pub fn remove_channel(&mut self, name: &str) -> Result<ChannelSpec> {
        let pos = self
            .channels
            .iter()
            .position(|c| c.name == name && c.preset == self.selected_preset)
            .with_context(|| format!("No channel named '{}' in the selected preset", name))?;
        Ok(self.channels.remove(pos))
    }

    pub fn set_channel_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let preset = self.selected_preset.clone();
        let channel = self
            .channels
            .iter_mut()
            .find(|c| c.name == name && c.preset == preset)
            .with_context(|| format!("No channel named '{}' in the selected preset", name))?;
        channel.enabled = enabled;
        Ok(())
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            path: self.encoder.path.clone(),
            search_path: self.encoder.search_path,
            timeout: Duration::from_secs(self.encoder.timeout_seconds),
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
