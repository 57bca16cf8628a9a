use core::fmt;

use crate::gate::GateState;
use crate::pins::PinProfile;
use crate::rails::{RAIL_COUNT, Rail};

/// Snapshot of controller state used by diagnostics consoles.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub prepared: bool,
    pub gate: GateState,
    pub wake_armed: bool,
    pub wake_holding: bool,
    pub finger_down_wait: bool,
    /// Output state per rail, indexed by [`Rail::as_index`]; `None` when the
    /// rail has no regulator.
    pub rails: [Option<bool>; RAIL_COUNT],
    pub last_profile: Option<PinProfile>,
    pub interrupts: u32,
    pub wake_hold_failures: u32,
}

impl StatusSnapshot {
    pub fn rail(&self, rail: Rail) -> Option<bool> {
        self.rails[rail.as_index()]
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "prepared: {}", on_off(self.prepared))?;
        write!(f, "rails:")?;
        for rail in Rail::ALL {
            match self.rail(rail) {
                Some(enabled) => write!(f, " {rail}={}", on_off(enabled))?,
                None => write!(f, " {rail}=missing")?,
            }
        }
        writeln!(f)?;
        match self.last_profile {
            Some(profile) => writeln!(f, "pins: {profile}")?,
            None => writeln!(f, "pins: unset")?,
        }
        writeln!(
            f,
            "irq: {} (display {}, proximity {})",
            if self.gate.irq_enabled {
                "unmasked"
            } else {
                "masked"
            },
            if self.gate.display_blanked {
                "blanked"
            } else {
                "on"
            },
            if self.gate.proximity_covered {
                "covered"
            } else {
                "clear"
            },
        )?;
        writeln!(
            f,
            "wake: {}{}, fingerdown_wait {}",
            if self.wake_armed { "armed" } else { "disarmed" },
            if self.wake_holding { " (holding)" } else { "" },
            on_off(self.finger_down_wait),
        )?;
        write!(
            f,
            "interrupts: {} ({} wake hold failures)",
            self.interrupts, self.wake_hold_failures
        )
    }
}
