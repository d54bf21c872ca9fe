// src/display/mod.rs
//! Status display
//!
//! The screen is a fixed grid of labels and value fields. [`status_fields`]
//! turns a snapshot into the value fields; renderers decide how to draw
//! them and which ones actually changed.

pub mod terminal;

use crate::{error::Result, geo::Proximity, monitor::SensorSnapshot};

pub use terminal::TerminalDisplay;

/// Static labels as (column, row, text)
pub const LABELS: &[(u16, u16, &str)] = &[
    (0, 2, "GPS:"),
    (22, 2, "HOME:"),
    (0, 7, "BATTERY:"),
    (0, 9, "USB:"),
    (0, 10, "ENGINE:"),
    (0, 11, "WIFI:"),
];

pub const TITLE: &str = "VAN MONITOR";

/// Colour class of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Good,
    Warning,
    Bad,
}

/// One value on the status screen
#[derive(Debug, Clone, PartialEq)]
pub struct StatusField {
    pub key: &'static str,
    pub column: u16,
    pub row: u16,
    pub text: String,
    pub tone: Tone,
}

impl StatusField {
    fn new(key: &'static str, column: u16, row: u16, text: impl Into<String>, tone: Tone) -> Self {
        Self {
            key,
            column,
            row,
            text: text.into(),
            tone,
        }
    }
}

/// Renders sensor snapshots and full-screen banners
pub trait StatusDisplay {
    fn render(&mut self, snapshot: &SensorSnapshot, proximity: Proximity) -> Result<()>;

    /// Replace the status screen with a few lines of text
    fn show_banner(&mut self, lines: &[&str]) -> Result<()>;
}

fn battery_tone(percentage: u8) -> Tone {
    if percentage > 50 {
        Tone::Good
    } else if percentage > 20 {
        Tone::Warning
    } else {
        Tone::Bad
    }
}

/// Value fields for a snapshot. Every key is always present; fields with
/// nothing to show carry empty text so stale values get erased.
pub fn status_fields(snapshot: &SensorSnapshot, proximity: Proximity) -> Vec<StatusField> {
    let gps = &snapshot.gps;
    let gps_tone = if gps.has_fix() { Tone::Good } else { Tone::Bad };

    let (home_text, home_tone) = match proximity {
        Proximity::Home => ("YES", Tone::Good),
        Proximity::Away => ("NO", Tone::Warning),
        Proximity::Unknown => ("?", Tone::Normal),
    };

    let (lat, lon) = match gps.position() {
        Some((lat, lon)) => (format!("LAT: {:.4}", lat), format!("LON: {:.4}", lon)),
        None => (String::new(), String::new()),
    };
    let speed = match gps.speed_kmh.filter(|_| gps.has_fix()) {
        Some(speed) => format!("SPEED: {:.1} km/h", speed),
        None => String::new(),
    };

    let (battery_text, battery_tone, charge_text) = match &snapshot.battery {
        Some(battery) => (
            format!("{}%", battery.percentage),
            battery_tone(battery.percentage),
            format!("Status: {}", battery.charge_state),
        ),
        None => ("N/A".to_string(), Tone::Warning, String::new()),
    };

    let time = match &gps.time_of_day {
        Some(time) => format!("TIME: {}", time),
        None => String::new(),
    };

    vec![
        StatusField::new("gps", 6, 2, gps.status_text(), gps_tone),
        StatusField::new("home", 28, 2, home_text, home_tone),
        StatusField::new("lat", 0, 3, lat, Tone::Normal),
        StatusField::new("lon", 0, 4, lon, Tone::Normal),
        StatusField::new("speed", 0, 5, speed, Tone::Normal),
        StatusField::new("battery", 10, 7, battery_text, battery_tone),
        StatusField::new("charge", 0, 8, charge_text, Tone::Normal),
        StatusField::new(
            "usb",
            10,
            9,
            if snapshot.engine_on { "CONNECTED" } else { "UNPLUGGED" },
            if snapshot.engine_on { Tone::Good } else { Tone::Warning },
        ),
        StatusField::new(
            "engine",
            10,
            10,
            if snapshot.engine_on { "ON" } else { "OFF" },
            if snapshot.engine_on { Tone::Good } else { Tone::Bad },
        ),
        StatusField::new(
            "wifi",
            10,
            11,
            if snapshot.wifi_connected { "CONNECTED" } else { "OFF" },
            if snapshot.wifi_connected { Tone::Good } else { Tone::Normal },
        ),
        StatusField::new("time", 0, 12, time, Tone::Normal),
    ]
}
