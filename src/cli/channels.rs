//! CLI handlers for channel and preset management.
//!
//! Edits go straight to the config file; a running recording is not affected.

use anyhow::{bail, Result};

use super::args::{ChannelsCliArgs, ChannelsCommand, PresetCliArgs};
use crate::audio::DeviceSelector;
use crate::config::Config;
use crate::session::ChannelSpec;

pub fn handle_channels_command(args: ChannelsCliArgs) -> Result<()> {
    let mut config = Config::load()?;

    match args.command {
        ChannelsCommand::List => {
            list_channels(&config);
            return Ok(());
        }
        ChannelsCommand::Add {
            name,
            device_id,
            device_name,
            format,
            preset,
            disabled,
        } => {
            if name.trim().is_empty() {
                bail!("Channel name cannot be empty");
            }
            let device = DeviceSelector {
                id: device_id,
                name: device_name,
            };
            let preset = preset.unwrap_or_else(|| config.selected_preset.clone());
            let mut channel = ChannelSpec::new(name, device, format).with_preset(preset);
            if disabled {
                channel = channel.disabled();
            }
            let summary = format!(
                "'{}' ({} -> {})",
                channel.name,
                channel.device.describe(),
                channel.format
            );
            config.add_channel(channel)?;
            println!("Added channel {}", summary);
        }
        ChannelsCommand::Remove { name } => {
            config.remove_channel(&name)?;
            println!("Removed channel '{}'", name);
        }
        ChannelsCommand::Enable { name } => {
            config.set_channel_enabled(&name, true)?;
            println!("Enabled channel '{}'", name);
        }
        ChannelsCommand::Disable { name } => {
            config.set_channel_enabled(&name, false)?;
            println!("Disabled channel '{}'", name);
        }
    }

    config.save()
}

fn list_channels(config: &Config) {
    if config.channels.is_empty() {
        println!("No channels configured. Add one with `audioknight channels add`.");
        return;
    }

    for preset in config.presets() {
        let marker = if preset == config.selected_preset {
            " (selected)"
        } else {
            ""
        };
        println!("=== {}{} ===", preset, marker);
        for channel in config.channels.iter().filter(|c| c.preset == preset) {
            println!(
                "  [{}] {:<20} {:<5} {}",
                if channel.enabled { "x" } else { " " },
                channel.name,
                channel.format,
                channel.device.describe()
            );
        }
    }
}

pub fn handle_preset_command(args: PresetCliArgs) -> Result<()> {
    let mut config = Config::load()?;

    let Some(name) = args.name else {
        let presets = config.presets();
        if presets.is_empty() {
            println!("Selected preset: {} (no channels)", config.selected_preset);
        }
        for preset in presets {
            let marker = if preset == config.selected_preset { "*" } else { " " };
            println!("{} {}", marker, preset);
        }
        return Ok(());
    };

    if !config.presets().contains(&name) {
        println!("Note: no channel belongs to preset '{}' yet", name);
    }
    config.selected_preset = name;
    config.save()?;
    println!("Selected preset '{}'", config.selected_preset);
    Ok(())
}
