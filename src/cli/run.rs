use std::error::Error;

use sixaxis::config::Config;
use sixaxis::drivers::sixaxis::driver::{Driver, StopHandle, Update};
use sixaxis::drivers::sixaxis::state::Button;
use sixaxis::transport::usb::NusbTransport;

use super::parse_usb_id;

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Milliseconds to wait between polls (0 polls continuously)
    #[arg(long)]
    pub sleep_ms: Option<u64>,
    /// Print every decoded input report
    #[arg(short, long, action)]
    pub verbose: bool,
    /// Enable USB transport debug logging
    #[arg(short, long, action)]
    pub debug: bool,
    /// Vendor id of the controller (hex)
    #[arg(long, value_parser = parse_usb_id)]
    pub vendor_id: Option<u16>,
    /// Product id of the controller (hex)
    #[arg(long, value_parser = parse_usb_id)]
    pub product_id: Option<u16>,
}

impl RunArgs {
    /// Returns the given config with command line overrides applied
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(sleep_ms) = self.sleep_ms {
            config.sleep_ms = sleep_ms;
        }
        if let Some(vendor_id) = self.vendor_id {
            config.vendor_id = vendor_id;
        }
        if let Some(product_id) = self.product_id {
            config.product_id = product_id;
        }
        config.verbose |= self.verbose;
        config.debug |= self.debug;
        config
    }
}

pub async fn handle_run(config: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let options = config.driver_options();
    let driver =
        tokio::task::spawn_blocking(move || Driver::connect(NusbTransport::new(), &options))
            .await??;

    // Setup CTRL+C handler
    let stop = driver.stop_handle();
    let signal_task = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for interrupt signal: {e}");
            return;
        }
        log::info!("Received interrupt");
        stop.stop();
    });

    let result = tokio::task::spawn_blocking(move || {
        driver.run(|update, stop| print_update(&config, update, stop))
    })
    .await;
    signal_task.abort();
    result??;

    Ok(())
}

/// Print newly pressed buttons and, in verbose mode, the whole report
fn print_update(config: &Config, update: &Update<'_>, stop: &StopHandle) {
    if config.verbose {
        println!("\nReading PS3 Input Report...");
        println!("{}\n", update.report.display());
    }

    if config.stop_on_home && update.state.is_pressed(Button::Home) {
        stop.stop();
    }

    for button in update.pressed.iter() {
        println!("\t{button}!!!");
    }
}
