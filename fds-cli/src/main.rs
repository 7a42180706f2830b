use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use fds_lib::command::Command as WireCommand;
use fds_lib::constants::READ_CHUNK_SIZE;
use fds_lib::device::{self, DeviceConfig, FdsDevice};
use fds_lib::file;
use fds_lib::session::Session;
use fds_lib::settings::{AdditionalNotification, GeneralSetting, PresetIndex, StageFlag, StageId, StageNumber};
use fds_lib::store::{Edit, SettingsStore, StageValue};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Configure an FDS wearable altimeter over USB.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Only talk to the device with this USB product id (hex, e.g. 8029).
    #[arg(long, value_parser = parse_hex)]
    product_id: Option<u16>,

    /// Seconds to wait for the device to finish sending its settings.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Bytes requested per USB read.
    #[arg(long, default_value_t = READ_CHUNK_SIZE)]
    read_size: usize,

    /// Milliseconds before an outbound USB write is abandoned.
    #[arg(long, default_value_t = 1000)]
    send_timeout_ms: u64,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// List attached altimeters.
    List,
    /// Print the device settings as JSON.
    Dump {
        /// Also print the wire messages that reproduce them.
        #[arg(long)]
        wire: bool,
    },
    /// Save the device settings to a backup file.
    Export { path: PathBuf },
    /// Restore a backup file onto the device.
    Import { path: PathBuf },
    /// Change one setting, e.g. `set useMetric true` or `set canopy.volume 7 --preset 2`.
    Set {
        field: String,
        value: String,
        /// Preset slot, 1 to 3. Ignored for general settings.
        #[arg(short, long, default_value_t = 1)]
        preset: usize,
    },
    /// Add or remove a notification on one preset stage.
    Notify {
        #[arg(value_enum)]
        op: NotifyOp,
        #[arg(value_enum)]
        stage: StageArg,
        altitude: u32,
        name: String,
        #[arg(short, long, default_value_t = 1)]
        preset: usize,
    },
    /// Play a notification on the device speaker.
    Play { name: String },
    /// List the notification names a stage accepts, including custom ones.
    Notifications {
        #[arg(value_enum)]
        stage: StageArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NotifyOp {
    Add,
    Remove,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    Ascend,
    Freefall,
    Canopy,
}

impl From<StageArg> for StageId {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Ascend => StageId::Ascend,
            StageArg::Freefall => StageId::Freefall,
            StageArg::Canopy => StageId::Canopy,
        }
    }
}

fn parse_hex(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    let mut config = DeviceConfig::new()
        .with_read_size(cli.read_size)
        .with_send_timeout(Duration::from_millis(cli.send_timeout_ms));
    if let Some(pid) = cli.product_id {
        config = config.with_product_id(pid);
    }

    match &cli.command {
        Action::List => list(&config),
        Action::Dump { wire } => {
            let session = connect(config, cli.timeout).await?;
            let settings = session.snapshot().await;
            println!("{}", file::export_settings(&settings)?);
            if *wire {
                for command in WireCommand::dump(&settings) {
                    println!("{}", command.encode()?);
                }
            }
            session.disconnect().await?;
            Ok(())
        }
        Action::Export { path } => {
            let session = connect(config, cli.timeout).await?;
            let settings = session.snapshot().await;
            file::save(path, &settings)
                .with_context(|| format!("Failed to write backup to {}", path.display()))?;
            session.disconnect().await?;
            Ok(())
        }
        Action::Import { path } => {
            let settings = file::load(path).with_context(|| format!("Failed to read backup {}", path.display()))?;
            let session = connect(config, cli.timeout).await?;
            let sent = session.import_and_send(settings).await?;
            info!(messages = sent, "Backup restored");
            session.disconnect().await?;
            Ok(())
        }
        Action::Set { field, value, preset } => {
            let edit = parse_edit(field, value, *preset)?;
            let session = connect(config, cli.timeout).await?;
            let command = session.apply_and_send(edit).await?;
            info!(field = %command.field(), "Setting updated");
            session.disconnect().await?;
            Ok(())
        }
        Action::Notify {
            op,
            stage,
            altitude,
            name,
            preset,
        } => {
            let preset = preset_arg(*preset)?;
            let notification = AdditionalNotification::new(name.as_str(), *altitude);
            let edit = match op {
                NotifyOp::Add => Edit::AddNotification(preset, (*stage).into(), notification),
                NotifyOp::Remove => Edit::RemoveNotification(preset, (*stage).into(), notification),
            };
            let session = connect(config, cli.timeout).await?;
            session.apply_and_send(edit).await?;
            session.disconnect().await?;
            Ok(())
        }
        Action::Play { name } => {
            let session = connect(config, cli.timeout).await?;
            session.play_notification(name).await?;
            session.disconnect().await?;
            Ok(())
        }
        Action::Notifications { stage } => {
            let session = connect(config, cli.timeout).await?;
            let names = session.store().lock().await.catalog().options((*stage).into());
            for name in names {
                println!("{name}");
            }
            session.disconnect().await?;
            Ok(())
        }
    }
}

fn list(config: &DeviceConfig) -> Result<()> {
    let devices = device::list_devices(config).context("Failed to enumerate USB devices")?;
    if devices.is_empty() {
        println!("No altimeter found.");
    }
    for (i, info) in devices.iter().enumerate() {
        println!(
            "#{}: {:04x}:{:04x} bus {:03} addr {:03} {} ({})",
            i + 1,
            info.vendor_id(),
            info.product_id(),
            info.bus_number(),
            info.device_address(),
            info.product_string().unwrap_or("<unknown product>"),
            info.serial_number().unwrap_or("no serial"),
        );
    }
    Ok(())
}

async fn connect(config: DeviceConfig, timeout: u64) -> Result<Session<FdsDevice>> {
    let request_settings = config.request_settings;
    let device = FdsDevice::open(config).await.context("Failed to open altimeter")?;
    let store = Arc::new(Mutex::new(SettingsStore::default()));
    let mut session = Session::start(device, store, request_settings).await?;
    tokio::time::timeout(Duration::from_secs(timeout), session.wait_ready())
        .await
        .context("Timed out waiting for the device settings")??;
    Ok(session)
}

fn preset_arg(preset: usize) -> Result<PresetIndex> {
    if preset == 0 {
        bail!("Presets are numbered 1 to 3");
    }
    Ok(PresetIndex::new(preset - 1)?)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Expected a boolean, got '{other}'"),
    }
}

/// Turn `field value` into an edit. Fields are the backup document names:
/// a general key, `dropzoneOffset`, `freefallThreshold` or `<stage>.<key>`.
fn parse_edit(field: &str, value: &str, preset: usize) -> Result<Edit> {
    match field {
        "dropzoneOffset" => Ok(Edit::DropzoneOffset(preset_arg(preset)?, value.parse()?)),
        "freefallThreshold" | "freefall.freefallThreshold" => {
            Ok(Edit::FreefallThreshold(preset_arg(preset)?, value.parse()?))
        }
        _ => match field.split_once('.') {
            Some((stage, key)) => {
                let stage: StageId = stage.parse().with_context(|| format!("Unknown stage '{stage}'"))?;
                let value = if let Ok(flag) = key.parse::<StageFlag>() {
                    StageValue::Flag(flag, parse_bool(value)?)
                } else if let Ok(number) = key.parse::<StageNumber>() {
                    StageValue::Number(number, value.parse()?)
                } else {
                    bail!("Unknown stage setting '{key}'");
                };
                Ok(Edit::Stage(preset_arg(preset)?, stage, value))
            }
            None => {
                let key: GeneralSetting = field.parse().with_context(|| format!("Unknown setting '{field}'"))?;
                Ok(Edit::General(key, parse_bool(value)?))
            }
        },
    }
}
