//! Error kinds shared by bring-up, sequencing, and the attribute surface.

use core::fmt;

use crate::pins::PinProfile;
use crate::rails::Rail;

/// Failure reported by a platform collaborator (regulator, pin controller,
/// GPIO, wake source). Carries the platform's raw error code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwError {
    code: i32,
}

impl HwError {
    /// Wraps a raw platform error code (negative errno style on Linux hosts).
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self { code }
    }

    /// Returns the raw platform code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.code
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hw error {}", self.code)
    }
}

/// Outcome of resolving a named platform resource.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolveError {
    /// The provider exists but is not ready yet; bring-up may be retried.
    NotReady,
    /// The resource is not described by the platform.
    Absent,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotReady => f.write_str("not ready"),
            ResolveError::Absent => f.write_str("absent"),
        }
    }
}

/// Platform handle resolved during bring-up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handle {
    Regulator(Rail),
    IrqLine,
    ResetLine,
    PinControl,
    PinProfile(PinProfile),
    WakeSource,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Regulator(rail) => write!(f, "regulator {rail}"),
            Handle::IrqLine => f.write_str("irq gpio"),
            Handle::ResetLine => f.write_str("reset gpio"),
            Handle::PinControl => f.write_str("pin control"),
            Handle::PinProfile(profile) => write!(f, "pin profile {profile}"),
            Handle::WakeSource => f.write_str("wake source"),
        }
    }
}

/// Errors surfaced by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A required handle was never resolved.
    HandleUnavailable(Handle),
    /// The resource provider is not ready yet; retry bring-up later.
    TransientUnready(Handle),
    /// Malformed or unknown request argument.
    InvalidRequest(&'static str),
    /// Rail control was requested for a rail without a regulator handle.
    InvalidRail(Rail),
    /// An individual rail, pin, or line operation failed.
    HardwareOperationFailed(HwError),
}

impl Error {
    /// Returns `true` when the caller should retry bring-up later.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Error::TransientUnready(_))
    }

    pub(crate) const fn from_resolve(handle: Handle, error: ResolveError) -> Self {
        match error {
            ResolveError::NotReady => Error::TransientUnready(handle),
            ResolveError::Absent => Error::HandleUnavailable(handle),
        }
    }
}

impl From<HwError> for Error {
    fn from(error: HwError) -> Self {
        Error::HardwareOperationFailed(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HandleUnavailable(handle) => write!(f, "{handle} unavailable"),
            Error::TransientUnready(handle) => write!(f, "{handle} not ready, retry later"),
            Error::InvalidRequest(detail) => write!(f, "invalid request: {detail}"),
            Error::InvalidRail(rail) => write!(f, "invalid rail {rail}"),
            Error::HardwareOperationFailed(error) => write!(f, "operation failed: {error}"),
        }
    }
}
