// src/power/pmu.rs
//! AXP2101 power-management unit decoding
//!
//! Register map used here:
//!
//! | Register | Meaning |
//! |---|---|
//! | `0x00` | status, bit 5 = VBUS (external power) present |
//! | `0x01` | charger status, low 3 bits = charge state |
//! | `0x34..=0x35` | battery voltage, big-endian millivolts |

use super::PowerSource;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const AXP2101_ADDR: u8 = 0x34;

const REG_STATUS: u8 = 0x00;
const REG_CHARGE_STATUS: u8 = 0x01;
const REG_BATTERY_VOLTAGE: u8 = 0x34;

const VBUS_PRESENT: u8 = 1 << 5;
const CHARGE_STATE_MASK: u8 = 0x07;

/// Li-ion range used for the percentage estimate
const EMPTY_MILLIVOLTS: i32 = 3000;
const FULL_MILLIVOLTS: i32 = 4200;

/// Byte-level register access on a shared bus
pub trait RegisterBus {
    /// Read `buf.len()` bytes starting at `register` of `device`
    fn read_registers(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeState {
    Trickle,
    PreCharge,
    ConstCurrent,
    ConstVoltage,
    Done,
    NotCharging,
    Unknown,
}

impl ChargeState {
    pub fn from_code(code: u8) -> Self {
        match code & CHARGE_STATE_MASK {
            0 => ChargeState::Trickle,
            1 => ChargeState::PreCharge,
            2 => ChargeState::ConstCurrent,
            3 => ChargeState::ConstVoltage,
            4 => ChargeState::Done,
            5 => ChargeState::NotCharging,
            _ => ChargeState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Trickle => "trickle",
            ChargeState::PreCharge => "pre-charge",
            ChargeState::ConstCurrent => "const-current",
            ChargeState::ConstVoltage => "const-voltage",
            ChargeState::Done => "done",
            ChargeState::NotCharging => "not-charging",
            ChargeState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub percentage: u8,
    pub voltage_volts: f64,
    pub charge_state: ChargeState,
}

impl BatteryStatus {
    /// Decode raw register values
    pub fn from_registers(charge_status: u8, millivolts: u16) -> Self {
        Self {
            percentage: percentage_from_millivolts(millivolts),
            voltage_volts: f64::from(millivolts) / 1000.0,
            charge_state: ChargeState::from_code(charge_status),
        }
    }
}

/// Linear estimate between empty and full cell voltage, clamped to 0..=100
pub fn percentage_from_millivolts(millivolts: u16) -> u8 {
    let pct = (i32::from(millivolts) - EMPTY_MILLIVOLTS) * 100 / (FULL_MILLIVOLTS - EMPTY_MILLIVOLTS);
    pct.clamp(0, 100) as u8
}

/// PMU driver over any register bus
pub struct Pmu<B> {
    bus: B,
    address: u8,
}

impl<B: RegisterBus> Pmu<B> {
    pub fn new(bus: B) -> Self {
        Self::with_address(bus, AXP2101_ADDR)
    }

    pub fn with_address(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    fn read_u8(&mut self, register: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.bus.read_registers(self.address, register, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_be(&mut self, register: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.bus.read_registers(self.address, register, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<B: RegisterBus> PowerSource for Pmu<B> {
    fn engine_present(&mut self) -> Result<bool> {
        Ok(self.read_u8(REG_STATUS)? & VBUS_PRESENT != 0)
    }

    fn battery_status(&mut self) -> Result<BatteryStatus> {
        let charge_status = self.read_u8(REG_CHARGE_STATUS)?;
        let millivolts = self.read_u16_be(REG_BATTERY_VOLTAGE)?;
        Ok(BatteryStatus::from_registers(charge_status, millivolts))
    }
}
