//! Electrical sequence templates shared by every target.
//!
//! A template is an ordered list of steps. Each step applies one action to a
//! rail, a pin profile, or the interrupt line and then holds for a fixed
//! duration that must sit inside the step's timing window. The controller
//! walks the steps in order under its serialization lock; nothing here knows
//! about a specific executor or platform.

use core::fmt;
use core::time::Duration;

use crate::pins::PinProfile;
use crate::rails::Rail;

pub mod power;
pub mod reset;

pub use power::{POWER_OFF_TEMPLATE, POWER_ON_TEMPLATE};
pub use reset::RESET_PULSE_TEMPLATE;

/// Longest template (the reset pulse) plus one step of headroom.
pub const MAX_SEQUENCE_STEPS: usize = 6;

/// Operation applied by a single step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceAction {
    SelectProfile(PinProfile),
    EnableRail(Rail),
    DisableRail(Rail),
    /// Reads the interrupt line and discards the level.
    SampleIrq,
}

impl fmt::Display for SequenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceAction::SelectProfile(profile) => write!(f, "select {profile}"),
            SequenceAction::EnableRail(rail) => write!(f, "enable {rail}"),
            SequenceAction::DisableRail(rail) => write!(f, "disable {rail}"),
            SequenceAction::SampleIrq => f.write_str("sample irq"),
        }
    }
}

/// Bounds on how long a step holds before the next one runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimingConstraintSet {
    pub min_hold: Option<Duration>,
    pub max_hold: Option<Duration>,
}

impl TimingConstraintSet {
    /// Constraints with no additional limits.
    pub const fn unrestricted() -> Self {
        Self {
            min_hold: None,
            max_hold: None,
        }
    }

    /// Create a constraint that bounds the hold duration.
    pub const fn with_hold_range(min_hold: Option<Duration>, max_hold: Option<Duration>) -> Self {
        Self { min_hold, max_hold }
    }

    /// Validate that a hold duration sits within the configured range.
    pub fn allows_hold(&self, hold_for: Duration) -> bool {
        if let Some(min) = self.min_hold
            && hold_for < min
        {
            return false;
        }
        if let Some(max) = self.max_hold
            && hold_for > max
        {
            return false;
        }
        true
    }
}

/// One ordered operation of a sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequenceStep {
    pub action: SequenceAction,
    pub hold_for: Duration,
    pub constraints: TimingConstraintSet,
}

impl SequenceStep {
    pub const fn new(
        action: SequenceAction,
        hold_for: Duration,
        constraints: TimingConstraintSet,
    ) -> Self {
        Self {
            action,
            hold_for,
            constraints,
        }
    }

    /// Step that moves straight on to the next one.
    pub const fn immediate(action: SequenceAction) -> Self {
        Self::new(action, Duration::ZERO, TimingConstraintSet::unrestricted())
    }
}

/// The type of sequence described by a template.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceKind {
    PowerOn,
    PowerOff,
    ResetPulse,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceKind::PowerOn => f.write_str("power-on"),
            SequenceKind::PowerOff => f.write_str("power-off"),
            SequenceKind::ResetPulse => f.write_str("reset-pulse"),
        }
    }
}

/// Immutable sequence template shared across targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequenceTemplate {
    pub kind: SequenceKind,
    pub phases: &'static [SequenceStep],
}

impl SequenceTemplate {
    pub const fn new(kind: SequenceKind, phases: &'static [SequenceStep]) -> Self {
        Self { kind, phases }
    }

    /// Returns the ordered steps that make up the sequence.
    pub const fn steps(&self) -> &'static [SequenceStep] {
        self.phases
    }

    /// Returns the number of steps contained in the template.
    pub fn step_count(&self) -> usize {
        self.phases.len()
    }

    /// Sum of every hold, i.e. the minimum wall time the sequence takes.
    pub fn total_hold(&self) -> Duration {
        self.phases.iter().map(|step| step.hold_for).sum()
    }
}
