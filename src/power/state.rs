// src/power/state.rs
//! Engine power state machine
//!
//! A single engine-off sample only arms a timer. The shutdown fires once the
//! engine has stayed off past the delay, so a brief dip on the power bus
//! (cranking, a loose connector) never puts the device to sleep.

use crate::time::Ticks;
use std::fmt;

/// How long the engine must stay off before shutting down
pub const SHUTDOWN_DELAY_MS: u32 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    EngineOn,
    EngineOffTimer { started_at: Ticks },
    ShuttingDown,
}

impl PowerState {
    pub fn engine_on(&self) -> bool {
        matches!(self, PowerState::EngineOn)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::EngineOn => write!(f, "engine on"),
            PowerState::EngineOffTimer { started_at } => {
                write!(f, "engine off since {} ms", started_at.as_millis())
            }
            PowerState::ShuttingDown => write!(f, "shutting down"),
        }
    }
}

/// What changed on an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    Steady,
    /// Engine just went off; the shutdown timer started
    EngineOff,
    /// Engine came back before the delay ran out
    EngineRestored,
    /// Delay exceeded; reported once per cycle
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct PowerStateMachine {
    state: PowerState,
    shutdown_delay_ms: u32,
}

impl PowerStateMachine {
    pub fn new() -> Self {
        Self::with_delay(SHUTDOWN_DELAY_MS)
    }

    pub fn with_delay(shutdown_delay_ms: u32) -> Self {
        Self {
            state: PowerState::EngineOn,
            shutdown_delay_ms,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Feed one engine-presence sample taken at `now`
    pub fn update(&mut self, engine_present: bool, now: Ticks) -> PowerEvent {
        let (next, event) = match (self.state, engine_present) {
            (PowerState::EngineOn, true) => (PowerState::EngineOn, PowerEvent::Steady),
            (PowerState::EngineOn, false) => (
                PowerState::EngineOffTimer { started_at: now },
                PowerEvent::EngineOff,
            ),
            (PowerState::EngineOffTimer { .. }, true) => {
                (PowerState::EngineOn, PowerEvent::EngineRestored)
            }
            (PowerState::EngineOffTimer { started_at }, false) => {
                if i64::from(now.diff(started_at)) > i64::from(self.shutdown_delay_ms) {
                    (PowerState::ShuttingDown, PowerEvent::Shutdown)
                } else {
                    (self.state, PowerEvent::Steady)
                }
            }
            (PowerState::ShuttingDown, _) => (PowerState::ShuttingDown, PowerEvent::Steady),
        };

        self.state = next;
        event
    }

    /// Start a fresh cycle after waking
    pub fn reset(&mut self) {
        self.state = PowerState::EngineOn;
    }
}

impl Default for PowerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_engine_on() {
        let machine = PowerStateMachine::new();
        assert_eq!(machine.state(), PowerState::EngineOn);
        assert!(machine.state().engine_on());
    }

    #[test]
    fn test_engine_off_starts_timer() {
        let mut machine = PowerStateMachine::new();
        let t0 = Ticks(10_000);
        assert_eq!(machine.update(true, Ticks(5_000)), PowerEvent::Steady);
        assert_eq!(machine.update(false, t0), PowerEvent::EngineOff);
        assert_eq!(machine.state(), PowerState::EngineOffTimer { started_at: t0 });
    }

    #[test]
    fn test_blip_restores_engine_on() {
        let mut machine = PowerStateMachine::new();
        let t0 = Ticks(10_000);
        machine.update(false, t0);
        assert_eq!(machine.update(true, t0.wrapping_add(5_000)), PowerEvent::EngineRestored);
        assert_eq!(machine.state(), PowerState::EngineOn);

        // The old timer is gone: a new dip starts from scratch
        let t1 = t0.wrapping_add(40_000);
        machine.update(false, t1);
        assert_eq!(machine.update(false, t1.wrapping_add(5_000)), PowerEvent::Steady);
        assert_eq!(machine.state(), PowerState::EngineOffTimer { started_at: t1 });
    }

    #[test]
    fn test_sustained_off_shuts_down_once() {
        let mut machine = PowerStateMachine::new();
        let t0 = Ticks(1_000);
        machine.update(false, t0);

        assert_eq!(machine.update(false, t0.wrapping_add(25_000)), PowerEvent::Steady);
        // Exactly at the delay is not yet past it
        assert_eq!(machine.update(false, t0.wrapping_add(30_000)), PowerEvent::Steady);
        assert_eq!(machine.update(false, t0.wrapping_add(30_001)), PowerEvent::Shutdown);
        assert_eq!(machine.state(), PowerState::ShuttingDown);

        assert_eq!(machine.update(false, t0.wrapping_add(35_000)), PowerEvent::Steady);
        assert_eq!(machine.update(true, t0.wrapping_add(40_000)), PowerEvent::Steady);
        assert_eq!(machine.state(), PowerState::ShuttingDown);
    }

    #[test]
    fn test_timer_across_counter_wrap() {
        let mut machine = PowerStateMachine::new();
        let t0 = Ticks(u32::MAX - 1_000);
        machine.update(false, t0);
        assert_eq!(machine.update(false, t0.wrapping_add(20_000)), PowerEvent::Steady);
        assert_eq!(machine.update(false, t0.wrapping_add(31_000)), PowerEvent::Shutdown);
    }

    #[test]
    fn test_reset_after_sleep() {
        let mut machine = PowerStateMachine::with_delay(100);
        machine.update(false, Ticks(0));
        machine.update(false, Ticks(200));
        assert_eq!(machine.state(), PowerState::ShuttingDown);

        machine.reset();
        assert_eq!(machine.state(), PowerState::EngineOn);
        assert_eq!(machine.update(false, Ticks(300)), PowerEvent::EngineOff);
    }
}
