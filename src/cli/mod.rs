//! CLI argument definitions.

use clap::Parser;

use crate::device::DeviceType;
use crate::engine::EngineOptions;

/// Powerwatch - desktop notifications for UPower battery and power-supply
/// events.
///
/// Connects to UPower on the system bus and to the notification service on
/// the session bus, then runs until the process is signalled or a bus
/// connection is lost.
#[derive(Parser, Debug)]
#[command(name = "pwatch", version, about, long_about = None)]
pub struct Cli {
    /// Don't notify for device state observed while the daemon starts up
    #[arg(long, short = 's')]
    pub skip_initial: bool,

    /// Only notify for devices flagged as power supplies
    #[arg(long, short = 'S')]
    pub power_supplies_only: bool,

    /// Ignore a device type by name (repeatable), e.g. "mouse" or
    /// "line-power"
    #[arg(
        long = "ignore-type",
        short = 'i',
        value_name = "TYPE",
        value_parser = parse_device_type
    )]
    pub ignored_types: Vec<DeviceType>,

    /// Verbose output (repeat for more detail)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Translate the flag surface into loop options.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            skip_initial: self.skip_initial,
            power_supplies_only: self.power_supplies_only,
            ignored_types: self.ignored_types.clone(),
            ..EngineOptions::default()
        }
    }
}

/// Value parser for `--ignore-type`. Rejecting here means a typo fails the
/// process before any bus connection is made.
fn parse_device_type(raw: &str) -> Result<DeviceType, String> {
    DeviceType::from_label(raw).ok_or_else(|| format!("unrecognized device type: {raw}"))
}
