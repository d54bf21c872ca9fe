// src/power/suspend.rs
//! Suspend-to-RAM with an RTC wake alarm

use super::DeepSleep;
use crate::error::{MonitorError, Result};
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Puts the board to sleep with `rtcwake`
#[derive(Debug, Clone)]
pub struct SuspendSleeper {
    mode: String,
}

impl SuspendSleeper {
    /// `mode` is an rtcwake mode such as `mem`, `standby` or `freeze`
    pub fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }

    fn args(&self, duration: Duration) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.mode.clone(),
            "-s".to_string(),
            duration.as_secs().max(1).to_string(),
        ]
    }
}

impl Default for SuspendSleeper {
    fn default() -> Self {
        Self::new("mem")
    }
}

impl DeepSleep for SuspendSleeper {
    async fn deep_sleep(&mut self, duration: Duration) -> Result<()> {
        info!(seconds = duration.as_secs(), mode = %self.mode, "Entering deep sleep");

        let output = Command::new("rtcwake")
            .args(self.args(duration))
            .output()
            .await
            .map_err(|e| MonitorError::Other(format!("Failed to run rtcwake: {}", e)))?;

        if !output.status.success() {
            return Err(MonitorError::Other(format!(
                "rtcwake exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Woke from deep sleep");
        Ok(())
    }
}
