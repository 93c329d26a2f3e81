//! usbcan command-line tool
//!
//! Lists attached USBCAN adapters and opens a channel to one of them.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::setup_logging;
use config::UsbcanConfig;
use protocol::DeviceList;
use std::io::BufRead;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "usbcan")]
#[command(author, version, about = "List and open USBCAN adapters")]
#[command(long_about = "
Discover USBCAN adapters attached to this machine and open a data channel.

EXAMPLES:
    # List attached adapters
    usbcan list

    # Same, as JSON
    usbcan list --json

    # Open the adapter whose firmware ID is \"Bench\"
    usbcan open Bench

    # Open a device by its system path and keep it until Enter is pressed
    usbcan open --path '\\\\?\\usb#vid_16d0&pid_0577#...' --hold

CONFIGURATION:
    The tool reads ~/.config/usbcan/usbcan.toml (or the path given with
    --config). A [device] section sets the adapter `open` uses when none is
    given on the command line.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached adapters (the default)
    List {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a data channel to an adapter
    Open {
        /// Firmware ID of the adapter (exact match)
        name: Option<String>,

        /// System path of the adapter; skips discovery
        #[arg(long, value_name = "PATH", conflicts_with = "name")]
        path: Option<String>,

        /// Keep the channel open until Enter is pressed
        #[arg(long)]
        hold: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = UsbcanConfig::default();
        let path = UsbcanConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = match args.config.as_deref() {
        Some(path) => UsbcanConfig::load_from(path).context("Failed to load configuration")?,
        None => UsbcanConfig::load_or_default(),
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    setup_logging(log_level).context("Failed to setup logging")?;
    debug!("usbcan v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::List { json: false }) {
        Command::List { json } => list(json),
        Command::Open { name, path, hold } => open(&config, name, path, hold),
    }
}

fn list(json: bool) -> Result<()> {
    let devices = usbcan::devices();

    if json {
        let out = serde_json::to_string_pretty(&devices).context("Failed to encode device list")?;
        println!("{}", out);
    } else {
        print_table(&devices);
    }
    Ok(())
}

fn print_table(devices: &DeviceList) {
    if devices.is_empty() {
        println!("No USBCAN devices found");
        return;
    }

    let width = devices
        .iter()
        .map(|d| d.name().chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!("{:<3} {:<width$}  PATH", "#", "NAME", width = width);
    for (index, device) in devices.iter().enumerate() {
        println!(
            "{:<3} {:<width$}  {}",
            index,
            device.name(),
            device.path(),
            width = width
        );
    }
}

fn open(config: &UsbcanConfig, name: Option<String>, path: Option<String>, hold: bool) -> Result<()> {
    let selection = config.device.selection(name, path);
    info!("Opening {:?}", selection);

    let channel = usbcan::select_and_open(&selection).context("Failed to open device")?;

    let record = channel.record();
    if record.name().is_empty() {
        println!("Opened {}", record.path());
    } else {
        println!("Opened {} at {}", record.name(), record.path());
    }

    if hold {
        println!("Press Enter to close the channel");
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
    }

    channel.close();
    Ok(())
}
