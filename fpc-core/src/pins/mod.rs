//! Named pin-control profiles for the reset and interrupt lines.

use core::fmt;

use crate::error::{Error, Handle, HwError, ResolveError};

/// Number of pin profiles resolved at bring-up.
pub const PROFILE_COUNT: usize = 3;

/// Pin configuration states defined by the platform.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinProfile {
    /// Reset line driven into reset.
    ResetReset,
    /// Reset line released.
    ResetActive,
    /// Interrupt line configured as an input.
    IrqActive,
}

impl PinProfile {
    pub const ALL: [PinProfile; PROFILE_COUNT] = [
        PinProfile::ResetReset,
        PinProfile::ResetActive,
        PinProfile::IrqActive,
    ];

    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            PinProfile::ResetReset => 0,
            PinProfile::ResetActive => 1,
            PinProfile::IrqActive => 2,
        }
    }

    /// Short profile name accepted by the attribute interface.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PinProfile::ResetReset => "reset-reset",
            PinProfile::ResetActive => "reset-active",
            PinProfile::IrqActive => "irq-active",
        }
    }

    /// Name of the state inside the platform's pin-control node.
    #[must_use]
    pub const fn platform_name(self) -> &'static str {
        match self {
            PinProfile::ResetReset => "fpc1020_reset_reset",
            PinProfile::ResetActive => "fpc1020_reset_active",
            PinProfile::IrqActive => "fpc1020_irq_active",
        }
    }

    /// Accepts either the short name or the platform name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        PinProfile::ALL
            .into_iter()
            .find(|profile| profile.name() == name || profile.platform_name() == name)
    }
}

impl fmt::Display for PinProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Platform pin-control provider.
pub trait PinControl {
    /// Opaque handle for a resolved profile.
    type State: Copy;

    /// Resolves a named profile from the platform description.
    fn lookup(&mut self, name: &str) -> Result<Self::State, ResolveError>;

    /// Applies a previously resolved profile.
    fn select(&mut self, state: Self::State) -> Result<(), HwError>;
}

/// Switches between the resolved profiles of one pin-control provider.
pub struct PinProfileSelector<P: PinControl> {
    control: P,
    states: [P::State; PROFILE_COUNT],
    last_selected: Option<PinProfile>,
}

impl<P: PinControl> PinProfileSelector<P> {
    /// Resolves every profile up front.
    ///
    /// # Errors
    ///
    /// Any missing profile aborts with [`Error::HandleUnavailable`], or
    /// [`Error::TransientUnready`] when the provider asks for a retry.
    pub fn resolve(mut control: P) -> Result<Self, Error> {
        let mut resolved: [Option<P::State>; PROFILE_COUNT] = [None; PROFILE_COUNT];
        for profile in PinProfile::ALL {
            let state = control.lookup(profile.platform_name()).map_err(|err| {
                error!("cannot find '{}': {}", profile.platform_name(), err);
                Error::from_resolve(Handle::PinProfile(profile), err)
            })?;
            info!("found pin control {}", profile.platform_name());
            resolved[profile.as_index()] = Some(state);
        }

        let [Some(reset), Some(active), Some(irq)] = resolved else {
            return Err(Error::HandleUnavailable(Handle::PinControl));
        };

        Ok(Self {
            control,
            states: [reset, active, irq],
            last_selected: None,
        })
    }

    /// Applies `profile`, logging the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareOperationFailed`] when the provider rejects the state.
    pub fn select(&mut self, profile: PinProfile) -> Result<(), Error> {
        match self.control.select(self.states[profile.as_index()]) {
            Ok(()) => {
                debug!("selected '{}'", profile);
                self.last_selected = Some(profile);
                Ok(())
            }
            Err(err) => {
                error!("cannot select '{}': {}", profile, err);
                Err(Error::HardwareOperationFailed(err))
            }
        }
    }

    /// Most recently applied profile, if any selection succeeded.
    pub fn last_selected(&self) -> Option<PinProfile> {
        self.last_selected
    }
}
