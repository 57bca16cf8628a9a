//! Sensor interrupt masking.
//!
//! The gate remembers the last state it applied to the interrupt controller
//! so that repeated display or proximity updates never unbalance the
//! platform's enable/disable depth.

pub mod policy;

pub use policy::{DisplayState, irq_should_be_enabled};

use crate::error::HwError;

/// Sensor interrupt line.
pub trait IrqLine {
    /// Unmasks the interrupt at the interrupt controller.
    fn enable_irq(&mut self);

    /// Masks the interrupt at the interrupt controller.
    fn disable_irq(&mut self);

    /// Reads the current line level.
    fn level(&mut self) -> Result<bool, HwError>;

    /// Registers the interrupt as a system wake source.
    fn enable_wake(&mut self) -> Result<(), HwError>;
}

/// Inputs and output of the interrupt policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GateState {
    pub irq_enabled: bool,
    pub display_blanked: bool,
    pub proximity_covered: bool,
}

impl GateState {
    /// The interrupt is requested enabled at bring-up with the display on.
    pub const INITIAL: GateState = GateState {
        irq_enabled: true,
        display_blanked: false,
        proximity_covered: false,
    };
}

impl Default for GateState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Applies the screen/proximity policy to one interrupt line.
pub struct InterruptGate<I> {
    line: I,
    state: GateState,
}

impl<I: IrqLine> InterruptGate<I> {
    pub const fn new(line: I) -> Self {
        Self {
            line,
            state: GateState::INITIAL,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Drives the line to `enabled`, touching the interrupt controller only
    /// when the request differs from the last applied state. Returns `true`
    /// when the line changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.state.irq_enabled == enabled {
            return false;
        }
        if enabled {
            self.line.enable_irq();
        } else {
            self.line.disable_irq();
        }
        self.state.irq_enabled = enabled;
        true
    }

    /// Records a display transition and re-evaluates the policy.
    pub fn on_display_state(&mut self, display: DisplayState) -> bool {
        self.state.display_blanked = display.is_blanked();
        self.reevaluate()
    }

    /// Records a proximity update and re-evaluates the policy.
    pub fn set_proximity(&mut self, covered: bool) -> bool {
        self.state.proximity_covered = covered;
        self.reevaluate()
    }

    fn reevaluate(&mut self) -> bool {
        let GateState {
            display_blanked,
            proximity_covered,
            ..
        } = self.state;
        self.set_enabled(irq_should_be_enabled(display_blanked, proximity_covered))
    }

    pub fn line_mut(&mut self) -> &mut I {
        &mut self.line
    }
}
