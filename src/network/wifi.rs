// src/network/wifi.rs
//! Wi-Fi through NetworkManager's command-line client

use super::WifiLink;
use crate::error::{MonitorError, Result};
use std::process::Stdio;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

/// Seconds nmcli waits for an association before returning
const NMCLI_WAIT_SECS: u32 = 1;

pub struct NmcliWifi {
    ssid: String,
    password: String,
}

impl NmcliWifi {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// The password is answered on stdin through `--ask` so it never shows
    /// up in the process table.
    fn connect_args(&self) -> Vec<String> {
        vec![
            "--ask".to_string(),
            "--wait".to_string(),
            NMCLI_WAIT_SECS.to_string(),
            "device".to_string(),
            "wifi".to_string(),
            "connect".to_string(),
            self.ssid.clone(),
        ]
    }
}

/// `nmcli -t -f STATE general` prints `connected` once a link is up
fn parse_general_state(stdout: &str) -> bool {
    stdout.lines().any(|line| line.trim() == "connected")
}

impl WifiLink for NmcliWifi {
    async fn connect(&mut self) -> Result<()> {
        let mut child = Command::new("nmcli")
            .args(self.connect_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MonitorError::Connection(format!("Failed to run nmcli: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let answer = format!("{}\n", self.password);
            // An open network never asks, so nmcli may exit before reading.
            if let Err(e) = stdin.write_all(answer.as_bytes()).await {
                debug!(error = %e, "nmcli closed stdin before the password was sent");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MonitorError::Connection(format!("nmcli did not finish: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MonitorError::Connection(format!(
                "nmcli connect to {} failed: {}",
                self.ssid,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn is_connected(&mut self) -> bool {
        match Command::new("nmcli")
            .args(["-t", "-f", "STATE", "general"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                parse_general_state(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "nmcli status check failed");
                false
            }
        }
    }
}
