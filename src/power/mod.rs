// src/power/mod.rs
//! Engine power, battery telemetry and sleep

pub mod pmu;
pub mod state;
pub mod suspend;

#[cfg(unix)]
pub mod i2c;

use crate::error::{MonitorError, Result};
use std::time::Duration;

pub use pmu::{BatteryStatus, ChargeState, Pmu};
pub use state::{PowerEvent, PowerState, PowerStateMachine, SHUTDOWN_DELAY_MS};

/// Source of engine-presence samples and battery readings
pub trait PowerSource {
    /// True while the vehicle supplies external power
    fn engine_present(&mut self) -> Result<bool>;

    fn battery_status(&mut self) -> Result<BatteryStatus>;
}

impl<T: PowerSource> PowerSource for Option<T> {
    fn engine_present(&mut self) -> Result<bool> {
        match self {
            Some(source) => source.engine_present(),
            None => Err(MonitorError::Bus("power controller not available".to_string())),
        }
    }

    fn battery_status(&mut self) -> Result<BatteryStatus> {
        match self {
            Some(source) => source.battery_status(),
            None => Err(MonitorError::Bus("power controller not available".to_string())),
        }
    }
}

/// Low-power sleep at the end of a shutdown sequence
#[allow(async_fn_in_trait)]
pub trait DeepSleep {
    /// Sleep for `duration`; returns once the device is awake again
    async fn deep_sleep(&mut self, duration: Duration) -> Result<()>;
}
