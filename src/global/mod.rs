use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "audioknight";
const RECORDINGS_DIR: &str = "AudioKnight";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("Unable to determine config directory")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// `<audio dir>/AudioKnight`, falling back to the home directory and then
/// the working directory.
pub fn default_output_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RECORDINGS_DIR)
}
