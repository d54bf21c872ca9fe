// src/power/i2c.rs
//! Linux i2c-dev register bus

use super::pmu::RegisterBus;
use crate::error::{MonitorError, Result};
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use std::path::{Path, PathBuf};

/// Register bus on a `/dev/i2c-N` character device
pub struct LinuxI2cBus {
    path: PathBuf,
    address: u8,
    device: LinuxI2CDevice,
}

impl LinuxI2cBus {
    /// Open the bus with `address` selected as the target device
    pub fn open(path: impl AsRef<Path>, address: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let device = Self::attach(&path, address)?;
        Ok(Self {
            path,
            address,
            device,
        })
    }

    fn attach(path: &Path, address: u8) -> Result<LinuxI2CDevice> {
        LinuxI2CDevice::new(path, u16::from(address)).map_err(|e| {
            MonitorError::Bus(format!(
                "Failed to open {} at 0x{:02x}: {}",
                path.display(),
                address,
                e
            ))
        })
    }
}

impl RegisterBus for LinuxI2cBus {
    fn read_registers(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<()> {
        if device != self.address {
            self.device = Self::attach(&self.path, device)?;
            self.address = device;
        }

        self.device.write(&[register]).map_err(|e| {
            MonitorError::Bus(format!("Register 0x{:02x} write failed: {}", register, e))
        })?;
        self.device.read(buf).map_err(|e| {
            MonitorError::Bus(format!("Register 0x{:02x} read failed: {}", register, e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let result = LinuxI2cBus::open("/dev/i2c-does-not-exist", 0x34);
        match result {
            Err(MonitorError::Bus(msg)) => assert!(msg.contains("0x34")),
            _ => panic!("expected a bus error"),
        }
    }
}
