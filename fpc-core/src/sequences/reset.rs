//! Timed reset pulse.
//!
//! The sensor needs a short release, a 5 ms reset assertion and another 5 ms
//! release before it answers on the bus. The interrupt line is sampled before
//! and after the pulse so its level is latched across the reset.

use core::time::Duration;

use super::{
    SequenceAction, SequenceKind, SequenceStep, SequenceTemplate, TimingConstraintSet,
};
use crate::pins::PinProfile;

/// Release time before asserting reset.
pub const PRE_RESET_RELEASE: Duration = Duration::from_micros(100);
pub const PRE_RESET_RELEASE_MIN: Duration = Duration::from_micros(100);
pub const PRE_RESET_RELEASE_MAX: Duration = Duration::from_micros(200);

/// Reset assertion time.
pub const RESET_ASSERT: Duration = Duration::from_micros(5_000);
pub const RESET_ASSERT_MIN: Duration = Duration::from_micros(5_000);
pub const RESET_ASSERT_MAX: Duration = Duration::from_micros(5_100);

/// Release time after the pulse before the sensor is usable.
pub const POST_RESET_RELEASE: Duration = Duration::from_micros(5_000);
pub const POST_RESET_RELEASE_MIN: Duration = Duration::from_micros(5_000);
pub const POST_RESET_RELEASE_MAX: Duration = Duration::from_micros(5_100);

pub const RESET_PULSE_STEPS: [SequenceStep; 5] = [
    SequenceStep::immediate(SequenceAction::SampleIrq),
    SequenceStep::new(
        SequenceAction::SelectProfile(PinProfile::ResetActive),
        PRE_RESET_RELEASE,
        TimingConstraintSet::with_hold_range(
            Some(PRE_RESET_RELEASE_MIN),
            Some(PRE_RESET_RELEASE_MAX),
        ),
    ),
    SequenceStep::new(
        SequenceAction::SelectProfile(PinProfile::ResetReset),
        RESET_ASSERT,
        TimingConstraintSet::with_hold_range(Some(RESET_ASSERT_MIN), Some(RESET_ASSERT_MAX)),
    ),
    SequenceStep::new(
        SequenceAction::SelectProfile(PinProfile::ResetActive),
        POST_RESET_RELEASE,
        TimingConstraintSet::with_hold_range(
            Some(POST_RESET_RELEASE_MIN),
            Some(POST_RESET_RELEASE_MAX),
        ),
    ),
    SequenceStep::immediate(SequenceAction::SampleIrq),
];

pub const RESET_PULSE_TEMPLATE: SequenceTemplate =
    SequenceTemplate::new(SequenceKind::ResetPulse, &RESET_PULSE_STEPS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_ends_released() {
        let profiles: Vec<PinProfile> = RESET_PULSE_TEMPLATE
            .steps()
            .iter()
            .filter_map(|step| match step.action {
                SequenceAction::SelectProfile(profile) => Some(profile),
                _ => None,
            })
            .collect();
        assert_eq!(
            profiles,
            [
                PinProfile::ResetActive,
                PinProfile::ResetReset,
                PinProfile::ResetActive
            ]
        );
    }

    #[test]
    fn irq_sampled_on_both_sides() {
        let steps = RESET_PULSE_TEMPLATE.steps();
        assert_eq!(steps[0].action, SequenceAction::SampleIrq);
        assert_eq!(steps[steps.len() - 1].action, SequenceAction::SampleIrq);
        assert_eq!(steps[2].hold_for, RESET_ASSERT);
    }
}
