// src/gps/mod.rs
//! GPS data handling and NMEA decoding

pub mod data;
pub mod nmea;
pub mod serial;

use crate::error::{MonitorError, Result};

pub use data::{GpsFix, TIME_PLACEHOLDER};
pub use nmea::{parse_sentence, read_fix, Sentence};

/// Line-oriented GPS transport.
///
/// `read_line` must not block: it returns `Ok(None)` when no complete line
/// is buffered. Errors mean the transport itself failed (bus, unplugged
/// device) and are turned into a hardware-error fix by the decoder.
pub trait LineSource {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    /// Drop lines that queued up since the last poll
    fn discard_pending(&mut self) {}
}

/// A port that failed to open reads as a transport error on every poll
impl<S: LineSource> LineSource for Option<S> {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            Some(source) => source.read_line(),
            None => Err(MonitorError::Connection("GPS port not open".to_string())),
        }
    }

    fn discard_pending(&mut self) {
        if let Some(source) = self {
            source.discard_pending();
        }
    }
}
