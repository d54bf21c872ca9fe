// src/config.rs
//! Configuration management
//!
//! Credentials, the home location and hardware paths live in a JSON file,
//! by default `$HOME/.config/van-monitor/config.json`. A missing file
//! yields placeholder values so the device still boots and logs locally.

use crate::{
    error::{MonitorError, Result},
    geo::{Home, DEFAULT_HOME_RADIUS_FT},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PLACEHOLDER_SSID: &str = "YOUR_WIFI_SSID";
const PLACEHOLDER_FTP_HOST: &str = "your-ftp-server.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: PLACEHOLDER_SSID.to_string(),
            password: "YOUR_WIFI_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub directory: String,
    pub timeout_secs: u64,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: PLACEHOLDER_FTP_HOST.to_string(),
            port: 21,
            user: "van_monitor".to_string(),
            password: "your_ftp_password".to_string(),
            directory: "/van_data".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsPortConfig {
    pub port: String,
    pub baudrate: u32,
    pub read_timeout_ms: u64,
}

impl Default for GpsPortConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 115_200,
            read_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub i2c_bus: String,
    pub address: u8,
    /// rtcwake mode used for deep sleep
    pub sleep_mode: String,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            i2c_bus: "/dev/i2c-0".to_string(),
            address: crate::power::pmu::AXP2101_ADDR,
            sleep_mode: "mem".to_string(),
        }
    }
}

/// Periodic task intervals in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub sensor_ms: u32,
    pub display_ms: u32,
    pub wifi_ms: u32,
    pub logging_ms: u32,
    pub cleanup_ms: u32,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            sensor_ms: 5_000,
            display_ms: 250,
            wifi_ms: 30_000,
            logging_ms: 60_000,
            cleanup_ms: 86_400_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub wifi: WifiConfig,
    pub home: Home,
    pub ftp: FtpConfig,
    pub gps: GpsPortConfig,
    pub power: PowerConfig,
    pub log_dir: PathBuf,
    pub sleep_secs: u64,
    pub intervals: Intervals,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            home: Home::new(40.7128, -74.0060, DEFAULT_HOME_RADIUS_FT),
            ftp: FtpConfig::default(),
            gps: GpsPortConfig::default(),
            power: PowerConfig::default(),
            log_dir: PathBuf::from("/sd"),
            sleep_secs: 10,
            intervals: Intervals::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MonitorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| MonitorError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| MonitorError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| MonitorError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("van-monitor")
            .join("config.json"))
    }

    /// True while the Wi-Fi or FTP settings are still the shipped placeholders
    pub fn has_placeholder_credentials(&self) -> bool {
        self.wifi.ssid == PLACEHOLDER_SSID || self.ftp.host == PLACEHOLDER_FTP_HOST
    }

    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.gps.port = port;
        self.gps.baudrate = baudrate;
    }
}
