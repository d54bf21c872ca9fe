// src/network/ftp.rs
//! Minimal FTP client for pushing daily logs
//!
//! Only what the upload needs: login, change directory, passive-mode
//! binary STOR of each file, quit.

use super::{UploadReport, Uploader};
use crate::error::{MonitorError, Result};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};
use tracing::{debug, info, warn};

pub const FTP_PORT: u16 = 21;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Substring of the PASS reply that marks a successful login
const LOGIN_OK: &str = "230";

#[derive(Debug, Clone)]
pub struct FtpUploader {
    host: String,
    port: u16,
    user: String,
    password: String,
    directory: String,
    timeout: Duration,
}

impl FtpUploader {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            directory: directory.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Uploader for FtpUploader {
    async fn upload(&mut self, files: &[PathBuf]) -> Result<UploadReport> {
        info!(host = %self.host, port = self.port, "Connecting to FTP server...");
        let mut session = Session::connect(&self.host, self.port, self.timeout).await?;

        let greeting = session.read_reply().await?;
        debug!(reply = %greeting.text, "FTP greeting");

        session.command(&format!("USER {}", self.user)).await?;
        let reply = session.command(&format!("PASS {}", self.password)).await?;
        if !reply.text.contains(LOGIN_OK) {
            return Err(MonitorError::Upload(format!(
                "login rejected: {}",
                reply.text
            )));
        }
        info!("FTP login successful");

        let reply = session.command(&format!("CWD {}", self.directory)).await?;
        if !reply.is_positive() {
            warn!(directory = %self.directory, reply = %reply.text, "FTP CWD refused");
        }

        let mut report = UploadReport::default();
        if !files.is_empty() {
            session.command("TYPE I").await?;
        }

        for path in files {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            info!(file = %name, "Uploading");
            match session.store(path, &name).await {
                Ok(()) => report.uploaded.push(name),
                Err(e) => {
                    warn!(file = %name, error = %e, "Upload failed");
                    report.failed.push(name);
                }
            }
        }

        if let Err(e) = session.command("QUIT").await {
            debug!(error = %e, "FTP QUIT failed");
        }
        Ok(report)
    }
}

/// One server reply; `text` holds every line of a multi-line reply
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    fn is_positive(&self) -> bool {
        (200..400).contains(&self.code)
    }
}

/// Control connection
struct Session {
    control: BufReader<TcpStream>,
    timeout: Duration,
}

impl Session {
    async fn connect(host: &str, port: u16, limit: Duration) -> Result<Self> {
        let stream = timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| MonitorError::Connection(format!("FTP connect to {} timed out", host)))?
            .map_err(|e| {
                MonitorError::Connection(format!("Failed to connect to {}:{}: {}", host, port, e))
            })?;

        Ok(Self {
            control: BufReader::new(stream),
            timeout: limit,
        })
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = timeout(self.timeout, self.control.read_line(&mut line))
            .await
            .map_err(|_| MonitorError::Connection("FTP reply timed out".to_string()))??;
        if read == 0 {
            return Err(MonitorError::Connection(
                "FTP server closed the connection".to_string(),
            ));
        }
        Ok(line.trim_end().to_string())
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let first = self.read_line().await?;
        let code = first
            .get(..3)
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| MonitorError::Upload(format!("malformed FTP reply {:?}", first)))?;

        let mut text = first.clone();
        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{} ", code);
            loop {
                let line = self.read_line().await?;
                text.push('\n');
                text.push_str(&line);
                if line.starts_with(&terminator) {
                    break;
                }
            }
        }

        Ok(Reply { code, text })
    }

    async fn command(&mut self, command: &str) -> Result<Reply> {
        let verb = command.split_whitespace().next().unwrap_or(command);
        let line = format!("{}\r\n", command);
        timeout(self.timeout, self.control.get_mut().write_all(line.as_bytes()))
            .await
            .map_err(|_| MonitorError::Connection(format!("FTP {} timed out", verb)))??;

        let reply = self.read_reply().await?;
        if verb == "PASS" {
            debug!(code = reply.code, "FTP PASS");
        } else {
            debug!(command, reply = %reply.text, "FTP");
        }
        Ok(reply)
    }

    async fn store(&mut self, path: &Path, name: &str) -> Result<()> {
        let contents = tokio::fs::read(path).await?;

        let reply = self.command("PASV").await?;
        let data_addr = parse_pasv_reply(&reply.text)?;
        let mut data = timeout(self.timeout, TcpStream::connect(data_addr))
            .await
            .map_err(|_| MonitorError::Connection("FTP data connect timed out".to_string()))??;

        let reply = self.command(&format!("STOR {}", name)).await?;
        if !reply.is_preliminary() && !reply.is_positive() {
            return Err(MonitorError::Upload(format!("STOR refused: {}", reply.text)));
        }

        timeout(self.timeout, async {
            data.write_all(&contents).await?;
            data.shutdown().await
        })
        .await
        .map_err(|_| MonitorError::Connection("FTP data transfer timed out".to_string()))??;
        drop(data);

        if reply.is_preliminary() {
            let done = self.read_reply().await?;
            if !done.is_positive() {
                return Err(MonitorError::Upload(format!("transfer failed: {}", done.text)));
            }
        }
        Ok(())
    }
}

/// Data address from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply
fn parse_pasv_reply(text: &str) -> Result<SocketAddr> {
    let malformed = || MonitorError::Upload(format!("malformed PASV reply {:?}", text));

    if !text.starts_with("227") {
        return Err(malformed());
    }
    let inner = match (text.find('('), text.rfind(')')) {
        (Some(start), Some(end)) if start < end => &text[start + 1..end],
        _ => text[3..]
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .trim_end()
            .trim_end_matches('.'),
    };

    let numbers = inner
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| malformed())?;
    if numbers.len() != 6 {
        return Err(malformed());
    }

    let ip = [numbers[0], numbers[1], numbers[2], numbers[3]];
    let port = u16::from(numbers[4]) << 8 | u16::from(numbers[5]);
    Ok(SocketAddr::from((ip, port)))
}
