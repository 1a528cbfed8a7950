pub mod args;
pub mod channels;
pub mod devices;
pub mod record;

pub use args::{Cli, CliCommand};
pub use channels::{handle_channels_command, handle_preset_command};
pub use devices::handle_devices_command;
pub use record::handle_record_command;
