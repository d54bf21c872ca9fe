// src/gps/serial.rs
//! Serial GPS receiver
//!
//! A background task reads newline-terminated sentences from the port and
//! queues them; the control loop drains the queue without blocking.

use super::LineSource;
use crate::error::{MonitorError, Result};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, error::TryRecvError},
    task::JoinHandle,
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{info, warn};

/// Sentences buffered between polls; newly read lines are dropped when full
const LINE_QUEUE_DEPTH: usize = 64;

pub struct SerialGps {
    lines: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    reader: JoinHandle<()>,
    /// Transport error seen while discarding; reported by the next read
    pending_error: Option<std::io::Error>,
}

impl SerialGps {
    /// Open the port and start the background line reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(port: &str, baudrate: u32) -> Result<Self> {
        info!(port, baudrate, "Opening GPS serial port");

        let serial = tokio_serial::new(port, baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()?;

        let (tx, rx) = mpsc::channel(LINE_QUEUE_DEPTH);

        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(serial);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => {
                        let eof = std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "GPS serial port closed",
                        );
                        let _ = tx.send(Err(eof)).await;
                        break;
                    }
                    Ok(_) => {
                        if tx.is_closed() {
                            break;
                        }
                        // Full queue: the consumer is not polling, drop the line.
                        let _ = tx.try_send(Ok(line.clone()));
                    }
                    Err(e) => {
                        warn!(error = %e, "Error reading from GPS serial port");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        Ok(Self::from_channel(rx, reader))
    }

    fn from_channel(
        lines: mpsc::Receiver<std::io::Result<Vec<u8>>>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            lines,
            reader,
            pending_error: None,
        }
    }
}

impl LineSource for SerialGps {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(e) = self.pending_error.take() {
            return Err(MonitorError::Io(e));
        }
        match self.lines.try_recv() {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(MonitorError::Io(e)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(MonitorError::Connection(
                "GPS reader task stopped".to_string(),
            )),
        }
    }

    fn discard_pending(&mut self) {
        while let Ok(item) = self.lines.try_recv() {
            if let Err(e) = item {
                self.pending_error = Some(e);
                break;
            }
        }
    }
}

impl Drop for SerialGps {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| format!("{} - {:?}", port.port_name, port.port_type))
        .collect())
}
