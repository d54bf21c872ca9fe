// src/gps/nmea.rs
//! NMEA sentence parsing and the bounded fix read
//!
//! Only the two sentences the monitor needs are decoded: RMC for position,
//! speed and time, GGA for the satellite count. Everything else on the
//! wire is ignored.

use super::{data::GpsFix, data::TIME_PLACEHOLDER, LineSource};
use crate::{
    error::{MonitorError, Result},
    time::Clock,
};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(3000);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const KNOTS_TO_KMH: f64 = 1.852;
/// Speeds below this are receiver jitter while parked
const STATIONARY_SPEED_KMH: f64 = 1.0;

/// Position data from an active RMC sentence
#[derive(Debug, Clone, PartialEq)]
pub struct RmcData {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub time_of_day: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    /// RMC with status `A`
    Rmc(RmcData),
    /// RMC without an active fix
    RmcVoid,
    Gga { satellites: u32 },
    /// Any other sentence type
    Ignored,
}

/// Parse a single NMEA sentence
pub fn parse_sentence(line: &str) -> Result<Sentence> {
    let line = line.trim();
    if !line.starts_with('$') {
        return Ok(Sentence::Ignored);
    }

    // Checksum is not verified, only stripped from the last field
    let body = line.split('*').next().unwrap_or(line);
    let parts: Vec<&str> = body.split(',').collect();

    match parts[0] {
        "$GPRMC" | "$GNRMC" => parse_rmc(&parts),
        "$GPGGA" | "$GNGGA" => parse_gga(&parts),
        _ => Ok(Sentence::Ignored),
    }
}

/// Parse RMC (Recommended Minimum) sentence
fn parse_rmc(parts: &[&str]) -> Result<Sentence> {
    if parts.len() > 2 && parts[2] != "A" {
        return Ok(Sentence::RmcVoid);
    }
    if parts.len() < 10 {
        return Err(MonitorError::parse(format!(
            "RMC sentence has only {} fields",
            parts.len()
        )));
    }

    let lat = parts[3];
    let lon = parts[5];
    if lat.is_empty() || lon.is_empty() {
        return Ok(Sentence::RmcVoid);
    }
    if lat.len() < 4 || lon.len() < 5 {
        return Err(MonitorError::parse("RMC coordinate field too short"));
    }

    Ok(Sentence::Rmc(RmcData {
        latitude: parse_coordinate(lat, 2, parts[4] == "S")?,
        longitude: parse_coordinate(lon, 3, parts[6] == "W")?,
        speed_kmh: parse_speed(parts[7])?,
        time_of_day: format_time(parts[1]),
    }))
}

/// Parse GGA (Fix Data) sentence, keeping only the satellite count
fn parse_gga(parts: &[&str]) -> Result<Sentence> {
    if parts.len() < 8 {
        return Err(MonitorError::parse(format!(
            "GGA sentence has only {} fields",
            parts.len()
        )));
    }

    let field = parts[7];
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MonitorError::parse(format!(
            "GGA satellite field {:?} is not a count",
            field
        )));
    }

    let satellites = field
        .parse::<u32>()
        .map_err(|e| MonitorError::parse(format!("GGA satellite count: {}", e)))?;
    Ok(Sentence::Gga { satellites })
}

/// `DDMM.MMMM` / `DDDMM.MMMM` to signed decimal degrees
fn parse_coordinate(field: &str, degree_digits: usize, negative: bool) -> Result<f64> {
    let invalid = || MonitorError::parse(format!("bad coordinate {:?}", field));

    let degrees = field
        .get(..degree_digits)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(invalid)?;
    let minutes = field
        .get(degree_digits..)
        .and_then(|m| m.parse::<f64>().ok())
        .ok_or_else(invalid)?;

    if !degrees.is_finite() || !(0.0..60.0).contains(&minutes) {
        return Err(invalid());
    }

    let value = degrees + minutes / 60.0;
    Ok(if negative { -value } else { value })
}

fn parse_speed(field: &str) -> Result<f64> {
    if field.is_empty() {
        return Ok(0.0);
    }
    let knots = field
        .parse::<f64>()
        .map_err(|_| MonitorError::parse(format!("bad speed {:?}", field)))?;
    let kmh = knots * KNOTS_TO_KMH;
    Ok(if kmh < STATIONARY_SPEED_KMH { 0.0 } else { kmh })
}

/// `HHMMSS[.sss]` to `HH:MM:SS`
fn format_time(field: &str) -> String {
    match field.get(..6) {
        Some(t) if t.is_ascii() => format!("{}:{}:{}", &t[0..2], &t[2..4], &t[4..6]),
        _ => TIME_PLACEHOLDER.to_string(),
    }
}

/// Sentences gathered during one read window
#[derive(Debug, Default)]
struct FixWindow {
    fix: GpsFix,
    rmc_seen: bool,
    gga_seen: bool,
    sentences: usize,
}

impl FixWindow {
    fn feed(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) if line.is_ascii() => line.trim(),
            _ => return,
        };
        if !line.starts_with('$') {
            return;
        }
        self.sentences += 1;

        match parse_sentence(line) {
            Ok(Sentence::Rmc(rmc)) => {
                self.fix.valid = true;
                self.fix.latitude = Some(rmc.latitude);
                self.fix.longitude = Some(rmc.longitude);
                self.fix.speed_kmh = Some(rmc.speed_kmh);
                self.fix.time_of_day = Some(rmc.time_of_day);
                self.rmc_seen = true;
            }
            Ok(Sentence::Gga { satellites }) => {
                self.fix.satellites = satellites;
                self.gga_seen = true;
            }
            Ok(Sentence::RmcVoid) | Ok(Sentence::Ignored) => {}
            Err(e) => debug!(error = %e, line, "Skipping NMEA sentence"),
        }
    }

    fn is_complete(&self) -> bool {
        self.rmc_seen && self.gga_seen
    }
}

/// Read sentences from `source` until a fix and satellite count are both
/// known, or `timeout` elapses. Never fails: transport errors produce a
/// hardware-error fix.
pub async fn read_fix<S, C>(source: &mut S, clock: &C, timeout: Duration) -> GpsFix
where
    S: LineSource,
    C: Clock,
{
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
    let start = clock.now();
    let mut window = FixWindow::default();
    source.discard_pending();

    while clock.now().diff(start) < timeout_ms {
        match source.read_line() {
            Ok(Some(raw)) => {
                window.feed(&raw);
                if window.is_complete() {
                    return window.fix;
                }
            }
            Ok(None) => clock.sleep(POLL_INTERVAL).await,
            Err(e) => {
                warn!(error = %e, "GPS read error");
                return GpsFix::hardware_error(e.to_string());
            }
        }
    }

    if window.sentences == 0 {
        debug!("GPS: no NMEA sentences received");
    } else {
        debug!(
            sentences = window.sentences,
            fix = window.fix.valid,
            satellites = window.fix.satellites,
            "GPS read window closed"
        );
    }
    window.fix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockLineSource};

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    #[test]
    fn test_rmc_parsing() {
        let Sentence::Rmc(rmc) = parse_sentence(RMC).unwrap() else {
            panic!("expected an active RMC");
        };
        assert!((rmc.latitude - 48.1173).abs() < 1e-4);
        assert!((rmc.longitude - 11.5167).abs() < 1e-4);
        assert_eq!(rmc.time_of_day, "12:35:19");
        // Speed should be converted from knots to km/h
        assert!((rmc.speed_kmh - 41.48).abs() < 0.01);
    }

    #[test]
    fn test_rmc_southern_western_hemisphere() {
        let line = "$GNRMC,081836,A,3751.650,S,14507.360,W,000.0,360.0,130998,011.3,E*62";
        let Sentence::Rmc(rmc) = parse_sentence(line).unwrap() else {
            panic!("expected an active RMC");
        };
        assert!((rmc.latitude + 37.8608).abs() < 1e-4);
        assert!((rmc.longitude + 145.1227).abs() < 1e-4);
    }

    #[test]
    fn test_rmc_void_status() {
        assert_eq!(parse_sentence("$GPRMC,123519,V,...").unwrap(), Sentence::RmcVoid);
        let line = "$GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
        assert_eq!(parse_sentence(line).unwrap(), Sentence::RmcVoid);
    }

    #[test]
    fn test_rmc_empty_coordinates_is_void() {
        let line = "$GPRMC,123519,A,,N,,E,,,230394,,*6A";
        assert_eq!(parse_sentence(line).unwrap(), Sentence::RmcVoid);
    }

    #[test]
    fn test_rmc_jitter_speed_clamped() {
        let line = "$GPRMC,123519,A,4807.038,N,01131.000,E,000.5,084.4,230394,003.1,W*6A";
        let Sentence::Rmc(rmc) = parse_sentence(line).unwrap() else {
            panic!("expected an active RMC");
        };
        assert_eq!(rmc.speed_kmh, 0.0);
    }

    #[test]
    fn test_rmc_short_time_uses_placeholder() {
        let line = "$GPRMC,1235,A,4807.038,N,01131.000,E,,084.4,230394,003.1,W*6A";
        let Sentence::Rmc(rmc) = parse_sentence(line).unwrap() else {
            panic!("expected an active RMC");
        };
        assert_eq!(rmc.time_of_day, TIME_PLACEHOLDER);
        assert_eq!(rmc.speed_kmh, 0.0);
    }

    #[test]
    fn test_rmc_truncated_is_error() {
        assert!(parse_sentence("$GPRMC,123519,A,4807.038,N,011").is_err());
        assert!(parse_sentence("$GPRMC,123519,A,48x7.038,N,01131.000,E,022.4,084.4,230394").is_err());
    }

    #[test]
    fn test_gga_parsing() {
        assert_eq!(parse_sentence(GGA).unwrap(), Sentence::Gga { satellites: 8 });
    }

    #[test]
    fn test_gga_non_digit_satellites() {
        let line = "$GPGGA,123519,4807.038,N,01131.000,E,1,0x,0.9,545.4,M,46.9,M,,*47";
        assert!(parse_sentence(line).is_err());
        assert!(parse_sentence("$GPGGA,123519,4807.038,N,01131.000,E,1,,0.9").is_err());
    }

    #[test]
    fn test_invalid_sentence() {
        assert_eq!(parse_sentence("$INVALID,123,456").unwrap(), Sentence::Ignored);
        assert_eq!(parse_sentence("GPRMC,no,marker").unwrap(), Sentence::Ignored);
    }

    #[test]
    fn test_window_keeps_satellites_on_bad_gga() {
        let mut window = FixWindow::default();
        window.feed(GGA.as_bytes());
        window.feed(b"$GPGGA,123520,4807.038,N,01131.000,E,1,??,0.9,545.4,M,46.9,M,,*47");
        assert_eq!(window.fix.satellites, 8);
    }

    #[test]
    fn test_window_ignores_garbage() {
        let mut window = FixWindow::default();
        window.feed(b"\xff\xfe$GPRMC");
        window.feed(b"noise without marker");
        window.feed("$GPRMC,123519,A,4807.038,N,01131.\u{e9}00,E".as_bytes());
        assert_eq!(window.sentences, 0);
        window.feed(b"$GPRMC,123519,A,4807.0$GPGGA,123519");
        assert_eq!(window.sentences, 1);
        assert!(!window.fix.valid);
    }

    #[tokio::test]
    async fn test_read_fix_returns_early_with_both_sentences() {
        let clock = MockClock::new();
        let mut source = MockLineSource::from_lines(&["$GPGSV,3,1,12", RMC, GGA, RMC]);

        let fix = read_fix(&mut source, &clock, DEFAULT_READ_TIMEOUT).await;

        assert!(fix.valid);
        assert_eq!(fix.satellites, 8);
        assert_eq!(fix.time_of_day.as_deref(), Some("12:35:19"));
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.discards, 1);
        assert_eq!(clock.now().as_millis(), 0);
    }

    #[tokio::test]
    async fn test_read_fix_times_out_with_partial_data() {
        let clock = MockClock::new();
        let mut source = MockLineSource::from_lines(&[RMC]);

        let fix = read_fix(&mut source, &clock, Duration::from_millis(500)).await;

        assert!(fix.valid);
        assert_eq!(fix.satellites, 0);
        assert!(clock.now().as_millis() >= 500);
    }

    #[tokio::test]
    async fn test_read_fix_without_rmc_is_invalid() {
        let clock = MockClock::new();
        let mut source = MockLineSource::from_lines(&[GGA, "$GPRMC,123519,V,,,,,,,230394,,*6A"]);

        let fix = read_fix(&mut source, &clock, Duration::from_millis(200)).await;

        assert!(!fix.valid);
        assert!(fix.position().is_none());
        assert_eq!(fix.satellites, 8);
    }

    #[tokio::test]
    async fn test_read_fix_survives_malformed_lines() {
        let clock = MockClock::new();
        let mut source = MockLineSource::from_lines(&[
            "$GPRMC,garbage",
            RMC,
            "$GPRMC,123520,A,48x7,N,01131.000,E,1,2,3",
            GGA,
        ]);

        let fix = read_fix(&mut source, &clock, DEFAULT_READ_TIMEOUT).await;

        assert!(fix.valid);
        assert!((fix.latitude.unwrap() - 48.1173).abs() < 1e-4);
        assert_eq!(fix.satellites, 8);
    }

    #[tokio::test]
    async fn test_read_fix_transport_error() {
        let clock = MockClock::new();
        let mut source = MockLineSource::from_lines(&[RMC]);
        source.push_error("device unplugged");

        let fix = read_fix(&mut source, &clock, DEFAULT_READ_TIMEOUT).await;

        assert!(!fix.valid);
        assert!(fix.error.as_deref().unwrap().contains("device unplugged"));
    }
}
