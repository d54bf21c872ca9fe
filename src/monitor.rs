// src/monitor.rs
//! Main control loop
//!
//! A single cooperative loop. Each tick checks a handful of interval gates
//! against the wrapping tick counter and runs whichever tasks are due. The
//! only waits inside a tick are the GPS read window and, on shutdown, the
//! sync-and-sleep sequence.

use crate::{
    config::{Intervals, MonitorConfig},
    display::StatusDisplay,
    geo::Home,
    gps::{nmea::DEFAULT_READ_TIMEOUT, read_fix, GpsFix},
    platform::{Devices, Platform},
    power::{BatteryStatus, PowerEvent, PowerSource, PowerState, PowerStateMachine, SHUTDOWN_DELAY_MS},
    storage::{LogEntry, LogStore, RETENTION_DAYS},
    sync::{SyncOrchestrator, SyncOutcome, SyncSettings},
    time::{Clock, Ticks},
};
use serde::Serialize;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tracing::{debug, info, warn};

const STARTUP_BANNER_DELAY: Duration = Duration::from_secs(2);

/// Latest reading of every sensor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub engine_on: bool,
    pub battery: Option<BatteryStatus>,
    pub wifi_connected: bool,
    pub gps: GpsFix,
    pub last_update: Ticks,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub home: Home,
    pub intervals: Intervals,
    pub gps_timeout: Duration,
    pub shutdown_delay_ms: u32,
    pub retention_days: i64,
    pub sync: SyncSettings,
}

impl MonitorSettings {
    pub fn new(home: Home, sleep_duration: Duration) -> Self {
        Self {
            home,
            intervals: Intervals::default(),
            gps_timeout: DEFAULT_READ_TIMEOUT,
            shutdown_delay_ms: SHUTDOWN_DELAY_MS,
            retention_days: RETENTION_DAYS,
            sync: SyncSettings::new(home, sleep_duration),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            intervals: config.intervals,
            gps_timeout: Duration::from_millis(config.gps.read_timeout_ms),
            ..Self::new(config.home, Duration::from_secs(config.sleep_secs))
        }
    }
}

/// Interval gate for one periodic task. Due on first evaluation, then
/// every `period_ms`.
#[derive(Debug, Clone, Copy)]
pub struct TaskGate {
    period_ms: u32,
    last_run: Option<Ticks>,
}

impl TaskGate {
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_run: None,
        }
    }

    pub fn is_due(&self, now: Ticks) -> bool {
        self.last_run
            .map_or(true, |last| now.has_elapsed(last, self.period_ms))
    }

    /// Claim the slot if due
    pub fn poll(&mut self, now: Ticks) -> bool {
        if self.is_due(now) {
            self.last_run = Some(now);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// A shutdown ran; the device slept and is awake again
    Woke(SyncOutcome),
}

#[derive(Debug, Clone, Copy)]
struct Gates {
    sensor: TaskGate,
    display: TaskGate,
    wifi: TaskGate,
    logging: TaskGate,
    cleanup: TaskGate,
}

impl Gates {
    fn new(intervals: &Intervals) -> Self {
        Self {
            sensor: TaskGate::new(intervals.sensor_ms),
            display: TaskGate::new(intervals.display_ms),
            wifi: TaskGate::new(intervals.wifi_ms),
            logging: TaskGate::new(intervals.logging_ms),
            cleanup: TaskGate::new(intervals.cleanup_ms),
        }
    }
}

pub struct Monitor<P: Platform> {
    devices: Devices<P>,
    settings: MonitorSettings,
    store: Option<LogStore>,
    snapshot: SensorSnapshot,
    power: PowerStateMachine,
    orchestrator: SyncOrchestrator,
    gates: Gates,
    last_sync: Option<SyncOutcome>,
}

impl<P: Platform> Monitor<P> {
    /// `store` is `None` when the data card is unusable; the loop then runs
    /// without logging or uploads.
    pub fn new(devices: Devices<P>, settings: MonitorSettings, store: Option<LogStore>) -> Self {
        Self {
            power: PowerStateMachine::with_delay(settings.shutdown_delay_ms),
            orchestrator: SyncOrchestrator::new(settings.sync.clone()),
            gates: Gates::new(&settings.intervals),
            devices,
            settings,
            store,
            snapshot: SensorSnapshot::default(),
            last_sync: None,
        }
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn last_sync(&self) -> Option<&SyncOutcome> {
        self.last_sync.as_ref()
    }

    pub fn devices(&self) -> &Devices<P> {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices<P> {
        &mut self.devices
    }

    /// Loop until `running` is cleared
    pub async fn run(&mut self, running: &AtomicBool) {
        self.show_startup().await;
        info!("Starting monitoring loop");
        let pause = Duration::from_millis(u64::from(self.settings.intervals.display_ms));

        while running.load(Ordering::Relaxed) {
            if let TickOutcome::Woke(outcome) = self.tick().await {
                info!(outcome = %outcome, "Resumed after deep sleep");
            }
            self.devices.clock.sleep(pause).await;
        }

        info!("Monitoring loop stopped");
    }

    /// One pass over the task gates
    pub async fn tick(&mut self) -> TickOutcome {
        let now = self.devices.clock.now();

        if self.gates.sensor.poll(now) && self.refresh_sensors(now).await == PowerEvent::Shutdown {
            let outcome = self.shutdown().await;
            return TickOutcome::Woke(outcome);
        }

        if self.gates.wifi.poll(now) {
            self.orchestrator
                .maintain_link(&mut self.devices, &mut self.snapshot)
                .await;
        }

        if self.gates.logging.poll(now) {
            self.log_snapshot();
        }

        if self.gates.cleanup.poll(now) {
            self.cleanup_logs();
        }

        if self.gates.display.poll(now) {
            self.render();
        }

        TickOutcome::Continue
    }

    async fn show_startup(&mut self) {
        let storage = if self.store.is_some() {
            "SD: Ready"
        } else {
            "SD: FAILED"
        };
        if let Err(e) = self
            .devices
            .display
            .show_banner(&["VAN MONITOR", "Starting...", storage])
        {
            debug!(error = %e, "Startup banner failed");
        }
        self.devices.clock.sleep(STARTUP_BANNER_DELAY).await;
    }

    async fn refresh_sensors(&mut self, now: Ticks) -> PowerEvent {
        let engine_present = self.devices.power.engine_present().unwrap_or_else(|e| {
            warn!(error = %e, "Engine sense read failed");
            false
        });
        self.snapshot.engine_on = engine_present;

        let event = self.power.update(engine_present, now);
        match event {
            PowerEvent::EngineOff => info!("Engine turned off - starting shutdown timer"),
            PowerEvent::EngineRestored => info!("Engine turned back on - shutdown cancelled"),
            PowerEvent::Shutdown => {
                info!(delay_ms = self.settings.shutdown_delay_ms, "Engine off too long - shutting down");
                return event;
            }
            PowerEvent::Steady => {}
        }

        self.snapshot.battery = match self.devices.power.battery_status() {
            Ok(battery) => Some(battery),
            Err(e) => {
                warn!(error = %e, "Battery read failed");
                None
            }
        };

        self.snapshot.gps =
            read_fix(&mut self.devices.gps, &self.devices.clock, self.settings.gps_timeout).await;
        self.snapshot.last_update = now;

        info!(
            engine = self.snapshot.engine_on,
            battery = ?self.snapshot.battery.map(|b| b.percentage),
            gps = %self.snapshot.gps.status_text(),
            time = self.snapshot.gps.time_text(),
            "Sensors updated"
        );
        if let Some(distance) = self.settings.home.distance_feet(&self.snapshot.gps) {
            debug!(distance_ft = distance.round(), "Distance from home");
        }

        event
    }

    async fn shutdown(&mut self) -> SyncOutcome {
        let outcome = self
            .orchestrator
            .run(&mut self.devices, &mut self.snapshot, self.store.as_ref())
            .await;

        // Fresh cycle after waking: every task is due again.
        self.snapshot = SensorSnapshot::default();
        self.power.reset();
        self.gates = Gates::new(&self.settings.intervals);
        self.last_sync = Some(outcome.clone());
        outcome
    }

    fn log_snapshot(&mut self) {
        let Some(store) = &self.store else {
            return;
        };

        let local = self.devices.clock.local_time();
        let entry = LogEntry::from_snapshot(
            &self.snapshot,
            &self.settings.home,
            self.devices.clock.unix_time(),
            local.date(),
        );
        match store.append(local.date(), &entry) {
            Ok(count) => debug!(count, "Logged sensor data"),
            Err(e) => warn!(error = %e, "Failed to write log entry"),
        }
    }

    fn cleanup_logs(&mut self) {
        let Some(store) = &self.store else {
            return;
        };

        let now = self.devices.clock.local_time();
        if let Err(e) = store.cleanup(now, self.settings.retention_days) {
            warn!(error = %e, "Log cleanup failed");
        }
    }

    fn render(&mut self) {
        let proximity = self.settings.home.proximity(&self.snapshot.gps);
        if let Err(e) = self.devices.display.render(&self.snapshot, proximity) {
            debug!(error = %e, "Display update failed");
        }
    }
}
