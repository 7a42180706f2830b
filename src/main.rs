use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use fds_lib::constants::VID;
use nusb::list_devices;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// List connected USB devices, altimeters first.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Show every USB device, not just altimeters.
    #[arg(short, long)]
    all: bool,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(args.verbose.tracing_level_filter().into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Listing connected USB devices...");

    let mut devices: Vec<_> = list_devices()
        .context("Error listing USB devices")?
        .filter(|d| args.all || d.vendor_id() == VID)
        .collect();
    devices.sort_by_key(|d| d.vendor_id() != VID);

    for (i, device_info) in devices.iter().enumerate() {
        info!(
            "Device #{}: VID: {:#06x}, PID: {:#06x}, Bus: {:03}, Address: {:03}{}",
            i + 1,
            device_info.vendor_id(),
            device_info.product_id(),
            device_info.bus_number(),
            device_info.device_address(),
            if device_info.vendor_id() == VID { " (altimeter)" } else { "" }
        );
        info!(
            "  Manufacturer: {}",
            device_info.manufacturer_string().unwrap_or("<Not available>")
        );
        info!("  Product: {}", device_info.product_string().unwrap_or("<Not available>"));
        info!("  Serial: {}", device_info.serial_number().unwrap_or("<Not available>"));
        info!("  Speed: {:?}", device_info.speed());
    }
    if devices.is_empty() {
        info!("No altimeter found.");
    }
    Ok(())
}
