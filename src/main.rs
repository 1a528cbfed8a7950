use anyhow::Result;
use audioknight::cli::{
    handle_channels_command, handle_devices_command, handle_preset_command, handle_record_command,
    Cli, CliCommand,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        CliCommand::Version => {
            println!("AudioKnight {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Devices(args) => handle_devices_command(args),
        CliCommand::Record(args) => handle_record_command(args).await,
        CliCommand::Channels(args) => handle_channels_command(args),
        CliCommand::Preset(args) => handle_preset_command(args),
    }
}
