use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::conversion::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "audioknight")]
#[command(
    about = "Record several audio devices at once, including what your speakers play",
    long_about = None
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// List capture and render endpoints
    Devices(DevicesCliArgs),
    /// Record every enabled channel of the selected preset
    Record(RecordCliArgs),
    /// Manage recording channels
    Channels(ChannelsCliArgs),
    /// Show presets, or select the one used for recording
    Preset(PresetCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct DevicesCliArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
    /// Include disabled and unplugged endpoints
    #[arg(short, long)]
    pub all: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RecordCliArgs {
    /// Stop automatically after this many seconds (default: until Ctrl-C)
    #[arg(short, long)]
    pub duration: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct ChannelsCliArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ChannelsCommand {
    /// Show configured channels
    List,
    /// Add a channel
    Add {
        /// Channel name; also the recorded file's name
        name: String,
        /// Endpoint id as shown by `devices`
        #[arg(long, required_unless_present = "device_name")]
        device_id: Option<String>,
        /// Endpoint friendly name, used when no id is given
        #[arg(long)]
        device_name: Option<String>,
        /// Output format (wav, wma, mp3, m4a)
        #[arg(short, long, default_value = "wav")]
        format: OutputFormat,
        /// Preset the channel belongs to (default: the selected preset)
        #[arg(short, long)]
        preset: Option<String>,
        /// Add the channel disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a channel
    Remove { name: String },
    /// Enable a channel
    Enable { name: String },
    /// Disable a channel
    Disable { name: String },
}

#[derive(ClapArgs, Debug)]
pub struct PresetCliArgs {
    /// Preset to select
    pub name: Option<String>,
}
