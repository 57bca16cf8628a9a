//! Screen and proximity interrupt policy.

use core::fmt;

/// Display state reported by the display subsystem.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayState {
    /// Panel powered down (blanked).
    PoweredDown,
    /// Panel on at reduced brightness.
    Normal,
    /// Panel fully on.
    Unblank,
}

impl DisplayState {
    const FB_BLANK_UNBLANK: i32 = 0;
    const FB_BLANK_NORMAL: i32 = 1;
    const FB_BLANK_POWERDOWN: i32 = 4;

    /// Decodes a framebuffer blank code. Codes other than unblank, normal and
    /// powerdown carry no display transition.
    #[must_use]
    pub const fn from_fb_blank(code: i32) -> Option<Self> {
        match code {
            Self::FB_BLANK_UNBLANK => Some(DisplayState::Unblank),
            Self::FB_BLANK_NORMAL => Some(DisplayState::Normal),
            Self::FB_BLANK_POWERDOWN => Some(DisplayState::PoweredDown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_blanked(self) -> bool {
        matches!(self, DisplayState::PoweredDown)
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::PoweredDown => f.write_str("powerdown"),
            DisplayState::Normal => f.write_str("normal"),
            DisplayState::Unblank => f.write_str("unblank"),
        }
    }
}

/// Decides whether the sensor interrupt should be unmasked.
///
/// The only masked combination is a blanked display with the proximity sensor
/// covered (phone in a pocket).
#[must_use]
pub const fn irq_should_be_enabled(display_blanked: bool, proximity_covered: bool) -> bool {
    !(display_blanked && proximity_covered)
}
