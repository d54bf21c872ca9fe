// src/error.rs
//! Error types for the van monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Bus(String),
    Connection(String),
    Parse(String),
    Upload(String),
    Config(String),
    Other(String),
}

impl MonitorError {
    /// Build a parse error from anything printable
    pub fn parse(msg: impl Into<String>) -> Self {
        MonitorError::Parse(msg.into())
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(e) => write!(f, "IO error: {}", e),
            MonitorError::Serial(e) => write!(f, "Serial error: {}", e),
            MonitorError::Json(e) => write!(f, "JSON error: {}", e),
            MonitorError::Bus(msg) => write!(f, "Register bus error: {}", msg),
            MonitorError::Connection(msg) => write!(f, "Connection error: {}", msg),
            MonitorError::Parse(msg) => write!(f, "Parse error: {}", msg),
            MonitorError::Upload(msg) => write!(f, "Upload error: {}", msg),
            MonitorError::Config(msg) => write!(f, "Config error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(e) => Some(e),
            MonitorError::Serial(e) => Some(e),
            MonitorError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(error: std::io::Error) -> Self {
        MonitorError::Io(error)
    }
}

impl From<tokio_serial::Error> for MonitorError {
    fn from(error: tokio_serial::Error) -> Self {
        MonitorError::Serial(error)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(error: serde_json::Error) -> Self {
        MonitorError::Json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = MonitorError::Upload("login rejected".to_string());
        assert_eq!(err.to_string(), "Upload error: login rejected");

        let err = MonitorError::parse("bad latitude");
        assert_eq!(err.to_string(), "Parse error: bad latitude");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MonitorError = io.into();
        assert!(matches!(err, MonitorError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
