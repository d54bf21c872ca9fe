// src/network/mod.rs
//! Wi-Fi association and log upload

pub mod ftp;
pub mod wifi;

use crate::{error::Result, time::Clock};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info, warn};

/// Association attempts before giving up
pub const WIFI_ATTEMPTS: u32 = 10;
pub const WIFI_ATTEMPT_INTERVAL: Duration = Duration::from_secs(1);

/// Station-mode Wi-Fi link
#[allow(async_fn_in_trait)]
pub trait WifiLink {
    /// Start associating with the configured network
    async fn connect(&mut self) -> Result<()>;

    async fn is_connected(&mut self) -> bool;
}

/// Result of an upload run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends pending log files to the collection server
#[allow(async_fn_in_trait)]
pub trait Uploader {
    async fn upload(&mut self, files: &[PathBuf]) -> Result<UploadReport>;
}

/// Bounded association: up to `attempts` status checks, `interval` apart
pub async fn associate<W, C>(link: &mut W, clock: &C, attempts: u32, interval: Duration) -> bool
where
    W: WifiLink,
    C: Clock,
{
    if link.is_connected().await {
        return true;
    }

    info!("Connecting to WiFi...");
    if let Err(e) = link.connect().await {
        warn!(error = %e, "WiFi connect request failed");
    }

    for attempt in 1..=attempts {
        if link.is_connected().await {
            info!(attempt, "WiFi connected");
            return true;
        }
        debug!(attempt, "WiFi not associated yet");
        clock.sleep(interval).await;
    }

    warn!(attempts, "WiFi association timed out");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockWifi};

    #[tokio::test]
    async fn test_already_connected_skips_connect() {
        let clock = MockClock::new();
        let mut wifi = MockWifi::connected();

        assert!(associate(&mut wifi, &clock, WIFI_ATTEMPTS, WIFI_ATTEMPT_INTERVAL).await);
        assert_eq!(wifi.connect_calls, 0);
    }

    #[tokio::test]
    async fn test_associates_after_a_few_polls() {
        let clock = MockClock::new();
        let mut wifi = MockWifi::connects_after(3);

        assert!(associate(&mut wifi, &clock, WIFI_ATTEMPTS, WIFI_ATTEMPT_INTERVAL).await);
        assert_eq!(wifi.connect_calls, 1);
        assert!(clock.now().as_millis() <= 3_000);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let clock = MockClock::new();
        let mut wifi = MockWifi::unavailable();

        assert!(!associate(&mut wifi, &clock, WIFI_ATTEMPTS, WIFI_ATTEMPT_INTERVAL).await);
        assert_eq!(clock.now().as_millis(), 10_000);
    }

    #[test]
    fn test_upload_report() {
        let mut report = UploadReport::default();
        report.uploaded.push("van_log_2024-03-01.json".to_string());
        assert!(report.is_complete());
        report.failed.push("van_log_2024-03-02.json".to_string());
        assert!(!report.is_complete());
    }
}
