// peqlib-cli -- exercise peqlib against real devices from the command line.
//
// Usage:
//   peqlib-cli list
//   peqlib-cli ports
//   peqlib-cli --port /dev/ttyACM0 info
//   peqlib-cli --port /dev/ttyACM0 pull --slot 0
//   peqlib-cli --port /dev/ttyACM0 push --slot 0 --gain -3 --filter PK:3000:-2.5:1.4
//   peqlib-cli --bt-port /dev/rfcomm0 --bt-uuid aeac4a03-dff5-498f-843a-34487cf133eb pull --slot 5
//   peqlib-cli --bt-port /dev/rfcomm0 --bt-uuid <uuid> push --slot 5 --file preset.json
//
// A preset file is either a JSON array of filters or an object
// `{"global_gain": -3.0, "filters": [...]}`, where each filter is
// `{"freq": 1000, "gain": -2.5, "q": 1.4, "type": "PK"}`.

mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use peqlib::{
    EqProfile, Filter, FilterType, SessionBuilder, SessionManager, device_table, picker_filters,
};
use peqlib_transport::{BluetoothBinding, SerialPortPicker, enumerate_ports, select_candidates};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// peqlib test application -- reads and writes parametric EQ on supported
/// USB and Bluetooth devices.
#[derive(Parser)]
#[command(name = "peqlib-cli", version, about)]
struct Cli {
    /// Only consider this serial port (e.g. /dev/ttyACM0, COM5).
    #[arg(long, global = true)]
    port: Option<String>,

    /// Bluetooth SPP port bound to the device (e.g. /dev/rfcomm0).
    /// Requires --bt-uuid.
    #[arg(long, global = true, requires = "bt_uuid")]
    bt_port: Option<String>,

    /// Service class UUID the Bluetooth port is bound to.
    #[arg(long, global = true, requires = "bt_port")]
    bt_uuid: Option<String>,

    /// Seconds to wait for each device response.
    #[arg(long, global = true, default_value_t = 3.0)]
    timeout: f64,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported vendors and models.
    List,

    /// List serial ports and whether they pass the device filters.
    Ports,

    /// Connect and print the matched device.
    Info,

    /// Print the active slot.
    Slot,

    /// Print the slots declared for the device.
    Slots,

    /// Read the EQ from a slot.
    Pull {
        #[arg(long, default_value_t = 0)]
        slot: i32,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Write an EQ to a slot.
    Push {
        #[arg(long, default_value_t = 0)]
        slot: i32,

        /// Global gain / preamp in dB. Overrides the preset file.
        #[arg(long, allow_hyphen_values = true)]
        gain: Option<f64>,

        /// Filter as TYPE:FREQ:GAIN:Q, e.g. PK:1000:-3:1.41. Repeatable.
        #[arg(long = "filter", value_parser = parse_filter, allow_hyphen_values = true)]
        filters: Vec<Filter>,

        /// JSON preset file.
        #[arg(long, conflicts_with = "filters")]
        file: Option<PathBuf>,
    },

    /// Turn PEQ processing on or off.
    Enable {
        #[arg(long, default_value_t = 0)]
        slot: i32,

        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

/// Parse `TYPE:FREQ:GAIN:Q`. Type names follow the preset file aliases.
fn parse_filter(s: &str) -> std::result::Result<Filter, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [kind, freq, gain, q] = parts.as_slice() else {
        return Err(format!("expected TYPE:FREQ:GAIN:Q, got '{s}'"));
    };
    let filter_type: FilterType = serde_json::from_value(serde_json::Value::from(*kind))
        .map_err(|_| format!("unknown filter type '{kind}' (use PK, LSQ or HSQ)"))?;
    let number = |field: &str, value: &str| {
        value
            .parse::<f64>()
            .map_err(|e| format!("invalid {field} '{value}': {e}"))
    };
    Ok(Filter::new(
        filter_type,
        number("frequency", *freq)?,
        number("gain", *gain)?,
        number("Q", *q)?,
    ))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PresetFile {
    Filters(Vec<Filter>),
    Preset {
        #[serde(default)]
        global_gain: f64,
        filters: Vec<Filter>,
    },
}

fn load_preset(path: &PathBuf) -> Result<(f64, Vec<Filter>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let preset: PresetFile = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid preset", path.display()))?;
    Ok(match preset {
        PresetFile::Filters(filters) => (0.0, filters),
        PresetFile::Preset {
            global_gain,
            filters,
        } => (global_gain, filters),
    })
}

// ---------------------------------------------------------------------------
// Commands that need no device
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    println!(
        "{:<10}  {:<14}  {:<12}  {:<40}  Writable slots",
        "Vendor", "Model", "Protocol", "Match"
    );
    println!("{}", "-".repeat(100));

    for descriptor in device_table() {
        for model in &descriptor.models {
            let matching = match (descriptor.usb_vendor_id, model.usb_product_id) {
                (Some(vid), Some(pid)) => format!("usb {vid:04x}:{pid:04x}"),
                _ => descriptor
                    .bluetooth_service_class_uuids
                    .iter()
                    .map(|uuid| format!("bt {uuid}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            let mut name = model.name.to_string();
            if model.config.experimental {
                name.push('*');
            }
            println!(
                "{:<10}  {:<14}  {:<12}  {:<40}  {:?}",
                descriptor.manufacturer,
                name,
                format!("{:?}", descriptor.protocol),
                matching,
                model.config.writable_slots(),
            );
        }
    }
    println!();
    println!("* experimental");
    Ok(())
}

fn cmd_ports(cli: &Cli) -> Result<()> {
    let ports = enumerate_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in &ports {
        match port.usb_ids {
            Some((vid, pid)) => println!("{:<24}  usb {vid:04x}:{pid:04x}", port.port_name),
            None => println!("{:<24}  -", port.port_name),
        }
    }

    let bluetooth: Vec<BluetoothBinding> = bluetooth_binding(cli).into_iter().collect();
    let candidates = select_candidates(&ports, &bluetooth, &picker_filters(), cli.port.as_deref());
    println!();
    if candidates.is_empty() {
        println!("No port matches a supported vendor.");
    }
    for candidate in candidates {
        println!("candidate: {} ({})", candidate.port, candidate.identity);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Device commands
// ---------------------------------------------------------------------------

fn bluetooth_binding(cli: &Cli) -> Option<BluetoothBinding> {
    match (&cli.bt_port, &cli.bt_uuid) {
        (Some(port), Some(uuid)) => Some(BluetoothBinding {
            port: port.clone(),
            service_class_uuid: uuid.clone(),
        }),
        _ => None,
    }
}

fn build_session(cli: &Cli) -> Result<SessionManager> {
    if !(cli.timeout.is_finite() && cli.timeout > 0.0) {
        bail!("--timeout must be a positive number of seconds");
    }

    let mut picker = SerialPortPicker::new();
    if let Some(port) = &cli.port {
        picker = picker.port(port);
    }
    if let Some(binding) = bluetooth_binding(cli) {
        picker = picker.bluetooth_port(&binding.port, &binding.service_class_uuid);
    }

    let response_timeout = Duration::from_secs_f64(cli.timeout);
    Ok(SessionBuilder::new()
        .picker(picker)
        .response_timeout(response_timeout)
        .operation_timeout(response_timeout * 2)
        .build())
}

fn print_profile(profile: &EqProfile, format: Format) -> Result<()> {
    if let Format::Json = format {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("Slot {} ({})", profile.slot_id, profile.slot_name);
    if profile.is_basic_profile {
        println!("Preset without parametric data.");
        return Ok(());
    }
    println!("Global gain: {:+.1} dB", profile.global_gain);
    println!("{:>3}  {:<10}  {:>9}  {:>8}  {:>6}", "#", "Type", "Freq", "Gain", "Q");
    for (i, f) in profile.filters.iter().enumerate() {
        println!(
            "{:>3}  {:<10}  {:>6.0} Hz  {:>+5.1} dB  {:>6.3}",
            i + 1,
            f.filter_type.to_string(),
            f.freq,
            f.gain,
            f.q
        );
    }
    for warning in &profile.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

async fn run_device_command(cli: &Cli, session: &SessionManager) -> Result<()> {
    let bound = session
        .get_device_connected()
        .await
        .context("failed to connect to a device")?;
    let device = bound.device();
    println!(
        "Connected to {} {} on {} ({})",
        device.manufacturer(),
        device.model(),
        device.port(),
        device.identity()
    );

    match &cli.command {
        Command::Info => {
            println!("Protocol: {:?}", device.protocol());
            println!("Writable slots: {:?}", device.config().writable_slots());
            println!(
                "Gain range: {} .. {} dB, {} bands",
                device.config().min_gain,
                device.config().max_gain,
                device.config().max_filters
            );
            match session.read_firmware().await {
                Ok(version) => println!("Firmware: {version}"),
                Err(e) => println!("Firmware: unavailable ({})", e.root()),
            }
        }
        Command::Slot => {
            let slot = session.get_current_slot().await?;
            println!("Current slot: {slot} ({})", device.config().slot_name(slot));
        }
        Command::Slots => {
            for slot in session.get_available_slots().await? {
                let writable = if device.config().is_writable_slot(slot.id) {
                    "  writable"
                } else {
                    ""
                };
                println!("{:>4}  {}{writable}", slot.id, slot.name);
            }
        }
        Command::Pull { slot, format } => {
            let profile = session.pull_from_device(*slot).await?;
            print_profile(&profile, *format)?;
        }
        Command::Push {
            slot,
            gain,
            filters,
            file,
        } => {
            let (file_gain, filters) = match file {
                Some(path) => load_preset(path)?,
                None => (0.0, filters.clone()),
            };
            let report = session
                .push_to_device(*slot, gain.unwrap_or(file_gain), &filters)
                .await?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!("Wrote {} filters to slot {slot}.", filters.len());
            if report.disconnected {
                println!("Device disconnected after saving.");
            }
        }
        Command::Enable { slot, state } => {
            let enabled = matches!(state, Toggle::On);
            session.enable_peq(enabled, *slot).await?;
            println!("PEQ {}.", if enabled { "enabled" } else { "disabled" });
        }
        Command::List | Command::Ports => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match &cli.command {
        Command::List => return cmd_list(),
        Command::Ports => return cmd_ports(&cli),
        _ => {}
    }

    let session = build_session(&cli)?;
    let result = run_device_command(&cli, &session).await;
    session.disconnect_device().await;
    result
}
