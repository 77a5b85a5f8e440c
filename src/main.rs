use std::env;
use std::process;

use clap::Parser;
use cli::{main_cli, Args};
use sixaxis::config::Config;

mod cli;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging is not set up yet, so report config errors after init
    let config = Config::load(args.config.as_deref());
    let debug = args.debug() || config.as_ref().is_ok_and(|config| config.debug);

    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    log_builder(&log_level, debug).init();

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting sixaxis v{}", VERSION);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = main_cli(args, config).await {
        log::error!("{e}");
        process::exit(1);
    }

    log::info!("sixaxis stopped");
}

/// Build the logger from the given filter string. Debug mode raises the USB
/// transport to debug, the most verbose level kept in release builds.
fn log_builder(filters: &str, debug: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filters);
    if debug {
        builder.filter_module("nusb", log::LevelFilter::Debug);
    }
    builder
}
