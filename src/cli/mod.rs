pub mod devices;
pub mod run;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devices::handle_devices;
use run::{handle_run, RunArgs};
use sixaxis::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML config file (default: search the config directories)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

impl Args {
    /// Returns true if USB transport debug logging was requested on the
    /// command line
    pub fn debug(&self) -> bool {
        matches!(&self.cmd, Some(Commands::Run(run_args)) if run_args.debug)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Poll the controller and print button presses (default)
    Run(RunArgs),
    /// List attached USB devices
    Devices {
        /// Only list devices with this vendor id (hex)
        #[arg(long, value_parser = parse_usb_id)]
        vendor_id: Option<u16>,
    },
}

pub async fn main_cli(args: Args, config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let cmd = args.cmd.unwrap_or(Commands::Run(RunArgs::default()));

    match cmd {
        Commands::Run(run_args) => handle_run(run_args.apply(config)).await?,
        Commands::Devices { vendor_id } => handle_devices(&config, vendor_id).await?,
    }

    Ok(())
}

/// Parse a USB vendor or product id written in hex, with or without a
/// leading "0x" (e.g. "054c" or "0x054C")
pub fn parse_usb_id(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid USB id '{value}': {e}"))
}
