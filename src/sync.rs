// src/sync.rs
//! Shutdown sequence: sync logs when parked at home, then deep sleep
//!
//! Every step past the proximity check may fail. Failures are logged and
//! shown, and the device always ends up asleep.

use crate::{
    display::StatusDisplay,
    geo::Home,
    monitor::SensorSnapshot,
    network::{associate, Uploader, WifiLink, WIFI_ATTEMPTS, WIFI_ATTEMPT_INTERVAL},
    platform::{Devices, Platform},
    power::DeepSleep,
    storage::LogStore,
    time::Clock,
};
use std::{fmt, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub home: Home,
    pub wifi_attempts: u32,
    pub wifi_attempt_interval: Duration,
    /// Pause after an upload attempt so the result stays readable
    pub upload_settle: Duration,
    pub idle_settle: Duration,
    /// How long the sleep banner shows before the board goes down
    pub banner_delay: Duration,
    pub sleep_duration: Duration,
}

impl SyncSettings {
    pub fn new(home: Home, sleep_duration: Duration) -> Self {
        Self {
            home,
            wifi_attempts: WIFI_ATTEMPTS,
            wifi_attempt_interval: WIFI_ATTEMPT_INTERVAL,
            upload_settle: Duration::from_secs(2),
            idle_settle: Duration::from_secs(1),
            banner_delay: Duration::from_secs(1),
            sleep_duration,
        }
    }
}

/// How the sync step of a shutdown ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    AwayFromHome,
    /// Log storage was unavailable, so there is nothing to send
    NoStorage,
    NoWifi,
    Uploaded { files: usize },
    UploadFailed(String),
}

impl SyncOutcome {
    pub fn status_text(&self) -> &'static str {
        match self {
            SyncOutcome::AwayFromHome => "Away from home",
            SyncOutcome::NoStorage => "No log storage",
            SyncOutcome::NoWifi => "No WiFi",
            SyncOutcome::Uploaded { .. } => "Upload complete",
            SyncOutcome::UploadFailed(_) => "Upload failed",
        }
    }

    fn attempted_upload(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Uploaded { .. } | SyncOutcome::UploadFailed(_)
        )
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Uploaded { files } => write!(f, "{} ({} files)", self.status_text(), files),
            SyncOutcome::UploadFailed(reason) => write!(f, "{}: {}", self.status_text(), reason),
            _ => f.write_str(self.status_text()),
        }
    }
}

pub struct SyncOrchestrator {
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(settings: SyncSettings) -> Self {
        Self { settings }
    }

    /// Full shutdown: sync if possible, report, then deep sleep. Returns
    /// after waking.
    pub async fn run<P: Platform>(
        &self,
        devices: &mut Devices<P>,
        snapshot: &mut SensorSnapshot,
        store: Option<&LogStore>,
    ) -> SyncOutcome {
        info!("Starting shutdown sequence");
        banner(devices, &["SHUTTING DOWN", "Checking WiFi..."]);

        let outcome = self.sync(devices, snapshot, store).await;
        info!(outcome = %outcome, "Sync finished");
        banner(devices, &["SHUTTING DOWN", outcome.status_text()]);

        let settle = if outcome.attempted_upload() {
            self.settings.upload_settle
        } else {
            self.settings.idle_settle
        };
        devices.clock.sleep(settle).await;

        self.sleep(devices).await;
        outcome
    }

    async fn sync<P: Platform>(
        &self,
        devices: &mut Devices<P>,
        snapshot: &mut SensorSnapshot,
        store: Option<&LogStore>,
    ) -> SyncOutcome {
        if !self.settings.home.contains(&snapshot.gps) {
            info!("Not close to home - skipping WiFi");
            return SyncOutcome::AwayFromHome;
        }
        let Some(store) = store else {
            warn!("Log storage unavailable - skipping WiFi and upload");
            return SyncOutcome::NoStorage;
        };

        info!("Close to home - attempting WiFi connection");
        snapshot.wifi_connected = associate(
            &mut devices.wifi,
            &devices.clock,
            self.settings.wifi_attempts,
            self.settings.wifi_attempt_interval,
        )
        .await;
        if !snapshot.wifi_connected {
            return SyncOutcome::NoWifi;
        }

        banner(devices, &["SHUTTING DOWN", "Uploading data..."]);
        let files = match store.pending_files() {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Could not list log files");
                Vec::new()
            }
        };

        match devices.uploader.upload(&files).await {
            Ok(report) if report.is_complete() => SyncOutcome::Uploaded {
                files: report.uploaded.len(),
            },
            Ok(report) => SyncOutcome::UploadFailed(format!(
                "{} of {} files failed",
                report.failed.len(),
                files.len()
            )),
            Err(e) => {
                warn!(error = %e, "FTP upload failed");
                SyncOutcome::UploadFailed(e.to_string())
            }
        }
    }

    async fn sleep<P: Platform>(&self, devices: &mut Devices<P>) {
        banner(devices, &["DEEP SLEEP", "ENGINE OFF"]);
        devices.clock.sleep(self.settings.banner_delay).await;

        let duration = self.settings.sleep_duration;
        if let Err(e) = devices.sleeper.deep_sleep(duration).await {
            warn!(error = %e, "Deep sleep unavailable, idling instead");
            devices.clock.sleep(duration).await;
        }
    }

    /// Periodic link upkeep: one association attempt when parked at home
    /// without a link, otherwise just refresh the link flag.
    pub async fn maintain_link<P: Platform>(
        &self,
        devices: &mut Devices<P>,
        snapshot: &mut SensorSnapshot,
    ) {
        let connected = devices.wifi.is_connected().await;
        if connected || !self.settings.home.contains(&snapshot.gps) {
            snapshot.wifi_connected = connected;
            return;
        }

        info!("Close to home - attempting WiFi connection");
        if let Err(e) = devices.wifi.connect().await {
            debug!(error = %e, "WiFi connect attempt failed");
        }
        snapshot.wifi_connected = devices.wifi.is_connected().await;
        if snapshot.wifi_connected {
            info!("WiFi connected");
        }
    }
}

fn banner<P: Platform>(devices: &mut Devices<P>, lines: &[&str]) {
    if let Err(e) = devices.display.show_banner(lines) {
        debug!(error = %e, "Display banner failed");
    }
}
