pub mod path;

use std::{io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drivers::sixaxis::driver::{DriverOptions, PID, VID};

/// Represents all possible errors loading a [Config]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Runtime configuration of the poller. Every field is optional in the YAML
/// file and falls back to its default.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// USB vendor id of the controller
    pub vendor_id: u16,
    /// USB product id of the controller
    pub product_id: u16,
    /// Milliseconds to wait between two polls. 0 polls continuously.
    pub sleep_ms: u64,
    /// Print every decoded report
    pub verbose: bool,
    /// Raise the USB transport log verbosity
    pub debug: bool,
    /// Stop the session when the PS button is pressed
    pub stop_on_home: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_id: VID,
            product_id: PID,
            sleep_ms: 0,
            verbose: false,
            debug: false,
            stop_on_home: true,
        }
    }
}

impl Config {
    /// Load a [Config] from the given YAML string
    pub fn from_yaml(content: String) -> Result<Config, LoadError> {
        let config: Config = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [Config] from the given YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// Load the configuration from the given path, or from the first config
    /// file found in the search paths. Defaults are used if no file exists.
    pub fn load(path: Option<&Path>) -> Result<Config, LoadError> {
        if let Some(path) = path {
            log::debug!("Loading config from {path:?}");
            return Config::from_yaml_file(path);
        }

        let Some(path) = path::find_config_file() else {
            log::debug!("No config file found. Using defaults.");
            return Ok(Config::default());
        };
        log::debug!("Loading config from {path:?}");
        Config::from_yaml_file(path)
    }

    /// Returns the options used to connect the device session
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            poll_interval: Duration::from_millis(self.sleep_ms),
            debug: self.debug,
        }
    }
}
