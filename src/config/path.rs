//! Module for searching for sixaxis config files

use std::path::PathBuf;

/// Name of the configuration file in every search directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/sixaxis";

/// Returns the base path for shipped configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("sixaxis") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::debug!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of config file paths in load order.
/// E.g. ["~/.config/sixaxis/config.yaml", "/etc/sixaxis/config.yaml", ...]
pub fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("sixaxis") {
        paths.push(base_dirs.get_config_home().join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/sixaxis").join(CONFIG_FILE_NAME));
    paths.push(get_base_path().join(CONFIG_FILE_NAME));
    paths.push(PathBuf::from("./rootfs/usr/share/sixaxis").join(CONFIG_FILE_NAME));

    paths
}

/// Returns the first config file that exists, if any
pub fn find_config_file() -> Option<PathBuf> {
    get_config_paths().into_iter().find(|path| {
        log::trace!("Checking {path:?} for config");
        path.is_file()
    })
}
