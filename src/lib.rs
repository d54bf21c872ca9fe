// src/lib.rs
//! Van Monitor Library
//!
//! Telemetry for a parked-or-driving van: GPS position, engine power and
//! battery readings, daily JSON logs, and an upload-then-sleep sequence
//! once the engine has been off for a while near home.

pub mod config;
pub mod display;
pub mod error;
pub mod geo;
pub mod gps;
pub mod monitor;
pub mod network;
pub mod platform;
pub mod power;
pub mod storage;
pub mod sync;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use gps::GpsFix;
pub use monitor::{Monitor, MonitorSettings, SensorSnapshot};
pub use platform::{Devices, Platform};
