//! Power-on and power-off sequences.
//!
//! Power-on holds the sensor in reset, brings up `vcc_spi`, `vdd_io` and
//! `vdd_ana` in that order, waits for the rails to settle and then releases
//! reset. Power-off parks the reset line first and tears the rails down in the
//! reverse order.

use core::time::Duration;

use super::{
    SequenceAction, SequenceKind, SequenceStep, SequenceTemplate, TimingConstraintSet,
};
use crate::pins::PinProfile;
use crate::rails::Rail;

/// Settle time after the last rail change.
pub const POWER_SETTLE: Duration = Duration::from_micros(100);
/// Minimum settle time.
pub const POWER_SETTLE_MIN: Duration = Duration::from_micros(100);
/// Maximum settle time.
pub const POWER_SETTLE_MAX: Duration = Duration::from_micros(1_000);

const SETTLE_WINDOW: TimingConstraintSet =
    TimingConstraintSet::with_hold_range(Some(POWER_SETTLE_MIN), Some(POWER_SETTLE_MAX));

/// Rails in power-on order.
pub const POWER_ON_ORDER: [Rail; 3] = [Rail::SpiSupply, Rail::IoSupply, Rail::AnalogSupply];

/// Rails in power-off order.
pub const POWER_OFF_ORDER: [Rail; 3] = [Rail::AnalogSupply, Rail::IoSupply, Rail::SpiSupply];

pub const POWER_ON_STEPS: [SequenceStep; 5] = [
    SequenceStep::immediate(SequenceAction::SelectProfile(PinProfile::ResetReset)),
    SequenceStep::immediate(SequenceAction::EnableRail(POWER_ON_ORDER[0])),
    SequenceStep::immediate(SequenceAction::EnableRail(POWER_ON_ORDER[1])),
    // Last rail up; let the supplies settle before releasing reset.
    SequenceStep::new(
        SequenceAction::EnableRail(POWER_ON_ORDER[2]),
        POWER_SETTLE,
        SETTLE_WINDOW,
    ),
    SequenceStep::immediate(SequenceAction::SelectProfile(PinProfile::ResetActive)),
];

pub const POWER_OFF_STEPS: [SequenceStep; 4] = [
    SequenceStep::new(
        SequenceAction::SelectProfile(PinProfile::ResetReset),
        POWER_SETTLE,
        SETTLE_WINDOW,
    ),
    SequenceStep::immediate(SequenceAction::DisableRail(POWER_OFF_ORDER[0])),
    SequenceStep::immediate(SequenceAction::DisableRail(POWER_OFF_ORDER[1])),
    SequenceStep::immediate(SequenceAction::DisableRail(POWER_OFF_ORDER[2])),
];

pub const POWER_ON_TEMPLATE: SequenceTemplate =
    SequenceTemplate::new(SequenceKind::PowerOn, &POWER_ON_STEPS);

pub const POWER_OFF_TEMPLATE: SequenceTemplate =
    SequenceTemplate::new(SequenceKind::PowerOff, &POWER_OFF_STEPS);

#[cfg(test)]
mod tests {
    use super::*;

    fn rails_in(template: SequenceTemplate) -> Vec<SequenceAction> {
        template
            .steps()
            .iter()
            .map(|step| step.action)
            .filter(|action| {
                matches!(
                    action,
                    SequenceAction::EnableRail(_) | SequenceAction::DisableRail(_)
                )
            })
            .collect()
    }

    #[test]
    fn power_on_brackets_rails_with_reset() {
        let steps = POWER_ON_TEMPLATE.steps();
        assert_eq!(
            steps.first().map(|step| step.action),
            Some(SequenceAction::SelectProfile(PinProfile::ResetReset))
        );
        assert_eq!(
            steps.last().map(|step| step.action),
            Some(SequenceAction::SelectProfile(PinProfile::ResetActive))
        );
        assert_eq!(
            rails_in(POWER_ON_TEMPLATE),
            [
                SequenceAction::EnableRail(Rail::SpiSupply),
                SequenceAction::EnableRail(Rail::IoSupply),
                SequenceAction::EnableRail(Rail::AnalogSupply),
            ]
        );
        assert_eq!(steps[3].hold_for, POWER_SETTLE);
    }

    #[test]
    fn power_off_mirrors_power_on() {
        let mut reversed = POWER_ON_ORDER;
        reversed.reverse();
        assert_eq!(reversed, POWER_OFF_ORDER);

        let steps = POWER_OFF_TEMPLATE.steps();
        assert_eq!(
            steps[0].action,
            SequenceAction::SelectProfile(PinProfile::ResetReset)
        );
        assert_eq!(steps[0].hold_for, POWER_SETTLE);
        assert_eq!(
            rails_in(POWER_OFF_TEMPLATE),
            [
                SequenceAction::DisableRail(Rail::AnalogSupply),
                SequenceAction::DisableRail(Rail::IoSupply),
                SequenceAction::DisableRail(Rail::SpiSupply),
            ]
        );
    }
}
