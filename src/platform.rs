// src/platform.rs
//! Hardware bundle
//!
//! [`Platform`] names one concrete type per collaborator so the control
//! loop is compiled against a fixed set of devices. [`Devices`] owns the
//! instances.

use crate::{
    display::StatusDisplay,
    gps::LineSource,
    network::{Uploader, WifiLink},
    power::{DeepSleep, PowerSource},
    time::Clock,
};

pub trait Platform {
    type Clock: Clock;
    type Gps: LineSource;
    type Power: PowerSource;
    type Wifi: WifiLink;
    type Uploader: Uploader;
    type Display: StatusDisplay;
    type Sleeper: DeepSleep;
}

/// Collaborator instances for a platform
pub struct Devices<P: Platform> {
    pub clock: P::Clock,
    pub gps: P::Gps,
    pub power: P::Power,
    pub wifi: P::Wifi,
    pub uploader: P::Uploader,
    pub display: P::Display,
    pub sleeper: P::Sleeper,
}

#[cfg(unix)]
pub use board::Board;

#[cfg(unix)]
mod board {
    use super::{Devices, Platform};
    use crate::{
        config::MonitorConfig,
        display::TerminalDisplay,
        gps::serial::SerialGps,
        network::{ftp::FtpUploader, wifi::NmcliWifi},
        power::{i2c::LinuxI2cBus, suspend::SuspendSleeper, Pmu},
        time::SystemClock,
    };
    use std::time::Duration;
    use tracing::warn;

    /// Linux board: serial GPS, PMU on I2C, NetworkManager Wi-Fi
    pub struct Board;

    impl Platform for Board {
        type Clock = SystemClock;
        type Gps = Option<SerialGps>;
        type Power = Option<Pmu<LinuxI2cBus>>;
        type Wifi = NmcliWifi;
        type Uploader = FtpUploader;
        type Display = TerminalDisplay;
        type Sleeper = SuspendSleeper;
    }

    impl Devices<Board> {
        /// Open every device. A GPS or PMU that fails to open is logged and
        /// left absent; its readings then degrade instead of stopping startup.
        ///
        /// Must be called from within a tokio runtime.
        pub fn open(config: &MonitorConfig, headless: bool) -> Self {
            let gps = match SerialGps::open(&config.gps.port, config.gps.baudrate) {
                Ok(gps) => Some(gps),
                Err(e) => {
                    warn!(error = %e, "GPS unavailable");
                    None
                }
            };

            let power = match LinuxI2cBus::open(&config.power.i2c_bus, config.power.address) {
                Ok(bus) => Some(Pmu::with_address(bus, config.power.address)),
                Err(e) => {
                    warn!(error = %e, "Power controller unavailable");
                    None
                }
            };

            let ftp = &config.ftp;
            let uploader = FtpUploader::new(
                ftp.host.clone(),
                ftp.port,
                ftp.user.clone(),
                ftp.password.clone(),
                ftp.directory.clone(),
            )
            .with_timeout(Duration::from_secs(ftp.timeout_secs));

            Devices {
                clock: SystemClock::new(),
                gps,
                power,
                wifi: NmcliWifi::new(config.wifi.ssid.clone(), config.wifi.password.clone()),
                uploader,
                display: if headless {
                    TerminalDisplay::headless()
                } else {
                    TerminalDisplay::new()
                },
                sleeper: SuspendSleeper::new(config.power.sleep_mode.clone()),
            }
        }
    }
}
