//! Configuration loading

mod schema;

pub use schema::{AppConfig, ButtonConfig, LedsConfig, StoreConfig, UpdateConfig};

use std::path::Path;

use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/emucd/config.json";

/// Load the configuration.
///
/// An explicitly given path must exist and parse; the default path is
/// optional and falls back to built-in defaults when absent.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.is_file() {
                read_config(path)
            } else {
                debug!("no configuration file at {}, using defaults", path.display());
                Ok(AppConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let config = serde_json::from_str(&text)
        .map_err(|e| AppError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
    info!("loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = load(Some(Path::new("/nonexistent/emucd.json")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults_elsewhere() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"store": {{"device": "/dev/sda1"}}, "update": {{"enabled": false}}}}"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.store.device, "/dev/sda1");
        assert_eq!(config.store.mount_point, "/mnt/imgstore");
        assert!(!config.update.enabled);
        assert_eq!(config.button.pin, 5);
    }

    #[test]
    fn test_garbage_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load(Some(file.path())),
            Err(AppError::Config(_))
        ));
    }
}
