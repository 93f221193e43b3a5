//! Configuration schema
//!
//! All sections default to the wiring of the reference Pi Zero build, so a
//! missing or partial configuration file still yields a runnable setup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Backing image store settings
    pub store: StoreConfig,
    /// Self-update settings
    pub update: UpdateConfig,
    /// Push button settings
    pub button: ButtonConfig,
    /// Indicator LED settings
    pub leds: LedsConfig,
}

/// Backing image store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Block device holding the image catalog
    pub device: String,
    /// Where the store partition is mounted locally
    pub mount_point: String,
    /// Name of the image list file at the store root
    pub descriptor_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            device: "/dev/mmcblk0p3".to_string(),
            mount_point: "/mnt/imgstore".to_string(),
            descriptor_file: "to-be-mounted.txt".to_string(),
        }
    }
}

impl StoreConfig {
    /// Mount point as a path
    pub fn mount_point_path(&self) -> PathBuf {
        PathBuf::from(&self.mount_point)
    }
}

/// Self-update configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Whether installing updates from the image store is allowed
    pub enabled: bool,
    /// Name of the update payload file at the store root
    pub payload_file: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            payload_file: "update-emucd.bin".to_string(),
        }
    }
}

/// Push button configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ButtonConfig {
    /// Whether the hardware button is wired up
    pub enabled: bool,
    /// GPIO character device (e.g. /dev/gpiochip0)
    pub gpio_chip: String,
    /// GPIO line number for the button
    pub pin: u32,
    /// Button is wired to ground with a pull-up
    pub active_low: bool,
    /// How long a press must last to count as a hold
    pub hold_secs: u64,
    /// Contact bounce filter window
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gpio_chip: "/dev/gpiochip0".to_string(),
            pin: 5,
            active_low: true,
            hold_secs: 3,
            debounce_ms: 30,
        }
    }
}

impl ButtonConfig {
    pub fn hold(&self) -> Duration {
        Duration::from_secs(self.hold_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Indicator LED configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedsConfig {
    /// Whether the indicator LEDs are wired up
    pub enabled: bool,
    /// GPIO character device (e.g. /dev/gpiochip0)
    pub gpio_chip: String,
    /// GPIO line number for the mode LED
    pub mode_pin: u32,
    /// GPIO line number for the activity LED
    pub activity_pin: u32,
}

impl Default for LedsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gpio_chip: "/dev/gpiochip0".to_string(),
            mode_pin: 26,
            activity_pin: 19,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.device, "/dev/mmcblk0p3");
        assert_eq!(config.mount_point_path(), PathBuf::from("/mnt/imgstore"));
        assert_eq!(config.descriptor_file, "to-be-mounted.txt");
    }

    #[test]
    fn test_button_defaults() {
        let config = ButtonConfig::default();
        assert!(config.enabled);
        assert!(config.active_low);
        assert_eq!(config.hold(), Duration::from_secs(3));
        assert_eq!(config.debounce(), Duration::from_millis(30));
    }

    #[test]
    fn test_update_enabled_by_default() {
        assert!(UpdateConfig::default().enabled);
    }
}
