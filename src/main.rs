//! Powerwatch - desktop notifications for UPower battery and power-supply
//! events.
#![forbid(unsafe_code)]

use clap::Parser;
use tracing::{error, info};

use pwatch::cli::Cli;
use pwatch::engine::Engine;
use pwatch::error::Result;
use pwatch::logging;
use pwatch::notify::DesktopNotifier;
use pwatch::source::UPowerSource;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let source = UPowerSource::connect().await?;
    let notifier = DesktopNotifier::connect().await?;

    info!("watching power devices");
    Engine::new(source, notifier, cli.engine_options()).run().await
}
