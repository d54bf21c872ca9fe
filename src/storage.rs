// src/storage.rs
//! Daily JSON log files
//!
//! One file per calendar day, `van_log_YYYY-MM-DD.json`, holding a JSON
//! array of entries. Appending rewrites the whole file.

use crate::{
    error::Result,
    geo::Home,
    gps::GpsFix,
    monitor::SensorSnapshot,
    power::BatteryStatus,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

pub const LOG_PREFIX: &str = "van_log_";
pub const LOG_EXTENSION: &str = ".json";
pub const RETENTION_DAYS: i64 = 28;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix seconds
    pub timestamp: i64,
    pub date: String,
    pub engine: bool,
    pub battery: Option<BatteryStatus>,
    pub wifi: bool,
    pub gps: GpsFix,
    pub close_to_home: bool,
}

impl LogEntry {
    pub fn from_snapshot(snapshot: &SensorSnapshot, home: &Home, timestamp: i64, date: NaiveDate) -> Self {
        Self {
            timestamp,
            date: date.format(DATE_FORMAT).to_string(),
            engine: snapshot.engine_on,
            battery: snapshot.battery,
            wifi: snapshot.wifi_connected,
            gps: snapshot.gps.clone(),
            close_to_home: home.contains(&snapshot.gps),
        }
    }
}

/// File name for a day's log
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}{}{}", LOG_PREFIX, date.format(DATE_FORMAT), LOG_EXTENSION)
}

/// Date encoded in a log file name, if it is one
pub fn log_date_from_file_name(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(LOG_PREFIX)?.strip_suffix(LOG_EXTENSION)?;
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Log directory on the data card
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Open the log directory and check that it is writable
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let marker = dir.join(".write_test");
        fs::write(&marker, b"van monitor write test")?;
        fs::remove_file(&marker)?;

        info!(dir = %dir.display(), "Log storage ready");
        Ok(Self { dir })
    }

    pub fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(log_file_name(date))
    }

    /// Append one entry to the day's file; returns the entry count
    pub fn append(&self, date: NaiveDate, entry: &LogEntry) -> Result<usize> {
        let path = self.day_file(date);

        // Existing entries are kept as raw JSON so older layouts survive
        let mut entries: Vec<serde_json::Value> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(file = %path.display(), error = %e, "Unreadable daily log, starting a new one");
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(file = %path.display(), "Creating new daily log");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        entries.push(serde_json::to_value(entry)?);

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&entries)?)?;
        fs::rename(&tmp, &path)?;

        debug!(file = %path.display(), count = entries.len(), "Logged entry");
        Ok(entries.len())
    }

    /// Entries recorded for `date`
    pub fn read_day(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        let path = self.day_file(date);
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Delete logs whose file-name date is more than `retention_days` before
    /// `now`. Returns the names removed.
    pub fn cleanup(&self, now: NaiveDateTime, retention_days: i64) -> Result<Vec<String>> {
        let cutoff = now - Duration::days(retention_days);
        let mut deleted = Vec::new();

        for name in self.log_file_names()? {
            let Some(date) = log_date_from_file_name(&name) else {
                continue;
            };
            let midnight = match date.and_hms_opt(0, 0, 0) {
                Some(midnight) => midnight,
                None => continue,
            };
            if midnight >= cutoff {
                continue;
            }

            match fs::remove_file(self.dir.join(&name)) {
                Ok(()) => {
                    info!(file = %name, "Deleted old log");
                    deleted.push(name);
                }
                Err(e) => warn!(file = %name, error = %e, "Failed to delete old log"),
            }
        }

        if deleted.is_empty() {
            debug!("No old log files to remove");
        } else {
            info!(count = deleted.len(), "Log cleanup complete");
        }
        Ok(deleted)
    }

    /// Every JSON file waiting to be uploaded, oldest first
    pub fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map_or(false, |n| n.ends_with(LOG_EXTENSION))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn log_file_names(&self) -> Result<Vec<String>> {
        Ok(fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(LOG_PREFIX) && name.ends_with(LOG_EXTENSION))
            .collect())
    }
}
