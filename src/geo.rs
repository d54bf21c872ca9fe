// src/geo.rs
//! Great-circle distance and home proximity

use crate::gps::GpsFix;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for the spherical approximation
pub const EARTH_RADIUS_MILES: f64 = 3959.0;
pub const FEET_PER_MILE: f64 = 5280.0;
pub const DEFAULT_HOME_RADIUS_FT: f64 = 2000.0;

/// Haversine distance between two coordinates, in feet
pub fn distance_feet(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c * FEET_PER_MILE
}

/// True when the fix is valid and within `radius_ft` of `home`
pub fn is_close_to_home(fix: &GpsFix, home: (f64, f64), radius_ft: f64) -> bool {
    match fix.position() {
        Some((lat, lon)) => distance_feet(lat, lon, home.0, home.1) <= radius_ft,
        None => false,
    }
}

/// The parking location that gates Wi-Fi and uploads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_ft: f64,
}

fn default_radius() -> f64 {
    DEFAULT_HOME_RADIUS_FT
}

impl Home {
    pub fn new(latitude: f64, longitude: f64, radius_ft: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_ft,
        }
    }

    /// Distance from home, if the fix has a position
    pub fn distance_feet(&self, fix: &GpsFix) -> Option<f64> {
        fix.position()
            .map(|(lat, lon)| distance_feet(lat, lon, self.latitude, self.longitude))
    }

    pub fn contains(&self, fix: &GpsFix) -> bool {
        is_close_to_home(fix, (self.latitude, self.longitude), self.radius_ft)
    }

    pub fn proximity(&self, fix: &GpsFix) -> Proximity {
        if fix.position().is_none() {
            Proximity::Unknown
        } else if self.contains(fix) {
            Proximity::Home
        } else {
            Proximity::Away
        }
    }
}

/// Proximity classification shown on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    Unknown,
    Home,
    Away,
}
