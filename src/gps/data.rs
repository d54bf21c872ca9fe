// src/gps/data.rs
//! GPS fix structure produced by each poll

use serde::{Deserialize, Serialize};

/// Placeholder reported when the receiver gives no usable UTC time
pub const TIME_PLACEHOLDER: &str = "??:??:??";

/// One resolved GPS sample, or an explicit "no fix".
///
/// Consumers must ignore the optional fields when `valid` is false; use
/// [`GpsFix::position`] rather than reading the coordinates directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    pub satellites: u32,
    /// Diagnostic tag set when the transport failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GpsFix {
    pub fn no_fix() -> Self {
        Self::default()
    }

    /// A failed read, tagged with what went wrong
    pub fn hardware_error(tag: impl Into<String>) -> Self {
        Self {
            error: Some(tag.into()),
            ..Self::default()
        }
    }

    /// Coordinates, only when the fix is valid and complete
    pub fn position(&self) -> Option<(f64, f64)> {
        if !self.valid {
            return None;
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn has_fix(&self) -> bool {
        self.position().is_some()
    }

    pub fn is_hardware_error(&self) -> bool {
        self.error.is_some()
    }

    /// Short status text for the display header
    pub fn status_text(&self) -> String {
        if self.is_hardware_error() {
            "HW ERROR".to_string()
        } else if self.valid {
            format!("FIX SAT:{}", self.satellites)
        } else {
            "NO FIX".to_string()
        }
    }

    pub fn time_text(&self) -> &str {
        self.time_of_day.as_deref().unwrap_or(TIME_PLACEHOLDER)
    }
}
