//! CLI handler for listing audio endpoints.

use anyhow::{Context, Result};

use super::args::DevicesCliArgs;
use crate::audio::{CpalBackend, DeviceDirectory, DeviceState, Direction, EndpointInfo};

pub fn handle_devices_command(args: DevicesCliArgs) -> Result<()> {
    let backend = CpalBackend::new();
    let mut endpoints = DeviceDirectory::new(&backend)
        .list()
        .context("Failed to list audio devices")?;
    if !args.all {
        endpoints.retain(|e| e.state == DeviceState::Active);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&endpoints)?);
        return Ok(());
    }

    if endpoints.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }

    print_group("Capture devices", &endpoints, Direction::Capture);
    print_group("Render devices (loopback)", &endpoints, Direction::Render);
    Ok(())
}

fn print_group(title: &str, endpoints: &[EndpointInfo], direction: Direction) {
    let group: Vec<_> = endpoints.iter().filter(|e| e.direction == direction).collect();
    println!("=== {} ===", title);
    if group.is_empty() {
        println!("  (none)");
    }
    for endpoint in group {
        println!("  {}", endpoint.name);
        println!("    id: {}  [{}]", endpoint.id, endpoint.state.as_str());
    }
    println!();
}
