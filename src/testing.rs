// src/testing.rs
//! In-memory collaborators for unit tests

use crate::{
    display::StatusDisplay,
    error::{MonitorError, Result},
    geo::Proximity,
    gps::LineSource,
    monitor::SensorSnapshot,
    network::{UploadReport, Uploader, WifiLink},
    platform::{Devices, Platform},
    power::{pmu::RegisterBus, BatteryStatus, DeepSleep, PowerSource},
    time::{Clock, Ticks},
};
use chrono::{NaiveDate, NaiveDateTime};
use std::{
    cell::Cell,
    collections::{HashMap, VecDeque},
    path::PathBuf,
    time::Duration,
};

/// Virtual clock; sleeping advances time instantly
#[derive(Debug)]
pub struct MockClock {
    start: u32,
    elapsed_ms: Cell<u64>,
    wall_origin: NaiveDateTime,
}

impl MockClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter starts at `start`; handy for wraparound cases
    pub fn starting_at(start: u32) -> Self {
        Self {
            start,
            elapsed_ms: Cell::new(0),
            wall_origin: NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.elapsed_ms.set(self.elapsed_ms.get() + ms);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.get()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Ticks {
        Ticks(self.start).wrapping_add(self.elapsed_ms.get() as u32)
    }

    fn local_time(&self) -> NaiveDateTime {
        self.wall_origin + chrono::Duration::milliseconds(self.elapsed_ms.get() as i64)
    }

    fn unix_time(&self) -> i64 {
        self.local_time().and_utc().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration.as_millis() as u64);
    }
}

/// Scripted GPS lines
#[derive(Debug, Default)]
pub struct MockLineSource {
    queue: VecDeque<std::result::Result<Vec<u8>, String>>,
    cycle: Vec<Vec<u8>>,
    pub discards: usize,
}

impl MockLineSource {
    /// Yields each line once, then nothing
    pub fn from_lines(lines: &[&str]) -> Self {
        Self {
            queue: lines.iter().map(|l| Ok(l.as_bytes().to_vec())).collect(),
            ..Self::default()
        }
    }

    /// Yields the lines over and over
    pub fn repeating(lines: &[&str]) -> Self {
        Self {
            cycle: lines.iter().map(|l| l.as_bytes().to_vec()).collect(),
            ..Self::default()
        }
    }

    pub fn push_error(&mut self, msg: &str) {
        self.queue.push_back(Err(msg.to_string()));
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl LineSource for MockLineSource {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.queue.is_empty() && !self.cycle.is_empty() {
            self.queue.extend(self.cycle.iter().cloned().map(Ok));
        }
        match self.queue.pop_front() {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(msg)) => Err(MonitorError::Connection(msg)),
            None => Ok(None),
        }
    }

    fn discard_pending(&mut self) {
        self.discards += 1;
    }
}

/// Register map keyed by (device, register)
#[derive(Debug, Default)]
pub struct MockRegisterBus {
    registers: HashMap<(u8, u8), Vec<u8>>,
    fail: bool,
}

impl MockRegisterBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, device: u8, register: u8, bytes: &[u8]) {
        self.registers.insert((device, register), bytes.to_vec());
    }

    pub fn fail_all(&mut self) {
        self.fail = true;
    }
}

impl RegisterBus for MockRegisterBus {
    fn read_registers(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(MonitorError::Bus("bus fault".to_string()));
        }
        let bytes = self.registers.get(&(device, register)).ok_or_else(|| {
            MonitorError::Bus(format!("no data at {:#04x}:{:#04x}", device, register))
        })?;
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(())
    }
}

/// Engine sense and battery with settable readings
#[derive(Debug, Default)]
pub struct MockPower {
    pub engine: bool,
    pub battery: Option<BatteryStatus>,
    pub fail: bool,
    pub samples: usize,
}

impl MockPower {
    pub fn engine_running() -> Self {
        Self {
            engine: true,
            ..Self::default()
        }
    }
}

impl PowerSource for MockPower {
    fn engine_present(&mut self) -> Result<bool> {
        self.samples += 1;
        if self.fail {
            return Err(MonitorError::Bus("engine sense failed".to_string()));
        }
        Ok(self.engine)
    }

    fn battery_status(&mut self) -> Result<BatteryStatus> {
        if self.fail {
            return Err(MonitorError::Bus("battery read failed".to_string()));
        }
        self.battery
            .ok_or_else(|| MonitorError::Bus("no battery".to_string()))
    }
}

/// Wi-Fi that associates after a number of status polls
#[derive(Debug, Default)]
pub struct MockWifi {
    connected_after: Option<u32>,
    status_polls: u32,
    pub connect_calls: u32,
}

impl MockWifi {
    pub fn connected() -> Self {
        Self::connects_after(0)
    }

    /// Reports connected once more than `polls` status checks were made
    pub fn connects_after(polls: u32) -> Self {
        Self {
            connected_after: Some(polls),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

impl WifiLink for MockWifi {
    async fn connect(&mut self) -> Result<()> {
        self.connect_calls += 1;
        match self.connected_after {
            Some(_) => Ok(()),
            None => Err(MonitorError::Connection("network not found".to_string())),
        }
    }

    async fn is_connected(&mut self) -> bool {
        self.status_polls += 1;
        self.connected_after
            .map_or(false, |polls| self.status_polls > polls)
    }
}

/// Records upload calls
#[derive(Debug, Default)]
pub struct MockUploader {
    pub calls: Vec<Vec<PathBuf>>,
    failure: Option<String>,
}

impl MockUploader {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            failure: Some(msg.to_string()),
            ..Self::default()
        }
    }
}

impl Uploader for MockUploader {
    async fn upload(&mut self, files: &[PathBuf]) -> Result<UploadReport> {
        self.calls.push(files.to_vec());
        if let Some(msg) = &self.failure {
            return Err(MonitorError::Upload(msg.clone()));
        }
        Ok(UploadReport {
            uploaded: files
                .iter()
                .filter_map(|f| f.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
            failed: Vec::new(),
        })
    }
}

/// Keeps the last rendered frame and every banner
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub renders: usize,
    pub last: Option<(SensorSnapshot, Proximity)>,
    pub banners: Vec<Vec<String>>,
}

impl RecordingDisplay {
    pub fn banner_text(&self) -> Vec<String> {
        self.banners.iter().map(|lines| lines.join(" / ")).collect()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn render(&mut self, snapshot: &SensorSnapshot, proximity: Proximity) -> Result<()> {
        self.renders += 1;
        self.last = Some((snapshot.clone(), proximity));
        Ok(())
    }

    fn show_banner(&mut self, lines: &[&str]) -> Result<()> {
        self.banners
            .push(lines.iter().map(|l| l.to_string()).collect());
        Ok(())
    }
}

/// Records deep-sleep requests; optionally refuses them
#[derive(Debug, Default)]
pub struct MockSleeper {
    pub sleeps: Vec<Duration>,
    pub fail: bool,
}

impl DeepSleep for MockSleeper {
    async fn deep_sleep(&mut self, duration: Duration) -> Result<()> {
        self.sleeps.push(duration);
        if self.fail {
            return Err(MonitorError::Other("sleep not supported".to_string()));
        }
        Ok(())
    }
}

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Clock = MockClock;
    type Gps = MockLineSource;
    type Power = MockPower;
    type Wifi = MockWifi;
    type Uploader = MockUploader;
    type Display = RecordingDisplay;
    type Sleeper = MockSleeper;
}

/// A valid fix inside the default test home radius
pub const HOME_RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,000.0,084.4,230394,003.1,W*6A";
pub const HOME_GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
/// Latitude and longitude of [`HOME_RMC`]
pub const HOME_POSITION: (f64, f64) = (48.1173, 11.516_666_666_666_667);

/// Engine running, parked at home, Wi-Fi in range, uploads succeed
pub fn mock_devices() -> Devices<MockPlatform> {
    Devices {
        clock: MockClock::new(),
        gps: MockLineSource::repeating(&[HOME_RMC, HOME_GGA]),
        power: MockPower::engine_running(),
        wifi: MockWifi::connected(),
        uploader: MockUploader::succeeding(),
        display: RecordingDisplay::default(),
        sleeper: MockSleeper::default(),
    }
}
