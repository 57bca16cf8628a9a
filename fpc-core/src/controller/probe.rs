//! Bring-up: resolve every platform handle and park the sensor in a known state.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::{Board, BoardResources, FpcController};
use crate::error::{Error, Handle, ResolveError};
use crate::pins::{PinProfile, PinProfileSelector};
use crate::rails::{RAIL_COUNT, Rail};

/// GPIO label of the sensor interrupt line.
pub const IRQ_GPIO_LABEL: &str = "fpc,gpio_irq";
/// GPIO label of the sensor reset line.
pub const RESET_GPIO_LABEL: &str = "fpc,gpio_rst";

/// Board options read from platform properties.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BoardConfig {
    /// Power the sensor up during bring-up.
    pub enable_on_boot: bool,
    /// Mark the device as able to wake the system.
    pub wakeup_capable: bool,
}

impl BoardConfig {
    pub const ENABLE_ON_BOOT_PROPERTY: &'static str = "fpc,enable-on-boot";
    pub const WAKEUP_PROPERTY: &'static str = "fpc,enable-wakeup";

    /// Reads the boolean platform properties through `lookup`.
    pub fn from_properties(lookup: impl Fn(&str) -> bool) -> Self {
        Self {
            enable_on_boot: lookup(Self::ENABLE_ON_BOOT_PROPERTY),
            wakeup_capable: lookup(Self::WAKEUP_PROPERTY),
        }
    }
}

/// Platform description the controller resolves its handles from.
pub trait ResourceProvider {
    type Board: Board;

    fn regulator(
        &mut self,
        name: &str,
    ) -> Result<<Self::Board as Board>::Regulator, ResolveError>;

    fn irq_line(&mut self, label: &str) -> Result<<Self::Board as Board>::Irq, ResolveError>;

    /// Claims a GPIO that is only driven through pin profiles.
    fn claim_gpio(&mut self, label: &str) -> Result<(), ResolveError>;

    fn pin_control(&mut self) -> Result<<Self::Board as Board>::Pins, ResolveError>;

    fn wake_source(&mut self) -> Result<<Self::Board as Board>::Wake, ResolveError>;

    /// Declares whether the device may wake the system.
    fn set_wakeup_capable(&mut self, capable: bool);

    fn delay(&mut self) -> <Self::Board as Board>::Delay;

    fn clock(&mut self) -> <Self::Board as Board>::Clock;
}

/// Resolves every handle, parks the pins, registers the interrupt as a wake
/// source, optionally powers the sensor and finishes with one reset pulse.
///
/// # Errors
///
/// [`Error::TransientUnready`] when a provider is not ready yet (retry later),
/// [`Error::HandleUnavailable`] when a handle is missing. Nothing is powered
/// when either is returned.
pub async fn probe<M, P>(
    mut provider: P,
    config: BoardConfig,
) -> Result<FpcController<M, P::Board>, Error>
where
    M: RawMutex,
    P: ResourceProvider,
{
    let mut regulators = [const { None }; RAIL_COUNT];
    for rail in Rail::ALL {
        let regulator = provider
            .regulator(rail.name())
            .map_err(|err| resolve_failed(Handle::Regulator(rail), rail.name(), err))?;
        regulators[rail.as_index()] = Some(regulator);
    }

    let irq = provider
        .irq_line(IRQ_GPIO_LABEL)
        .map_err(|err| resolve_failed(Handle::IrqLine, IRQ_GPIO_LABEL, err))?;
    provider
        .claim_gpio(RESET_GPIO_LABEL)
        .map_err(|err| resolve_failed(Handle::ResetLine, RESET_GPIO_LABEL, err))?;

    let control = provider.pin_control().map_err(|err| {
        if err == ResolveError::NotReady {
            info!("pin control is not ready");
        }
        resolve_failed(Handle::PinControl, "pin control", err)
    })?;
    let pins = PinProfileSelector::resolve(control)?;

    let wake = provider
        .wake_source()
        .map_err(|err| resolve_failed(Handle::WakeSource, "wake source", err))?;

    let controller = FpcController::new(BoardResources {
        regulators,
        pins,
        irq,
        delay: provider.delay(),
        wake,
        clock: provider.clock(),
    });

    // Selection failures are logged and recorded; bring-up carries on.
    let _ = controller.select_profile(PinProfile::ResetReset).await;
    let _ = controller.select_profile(PinProfile::IrqActive).await;
    controller.arm_wake(false);

    if config.wakeup_capable {
        provider.set_wakeup_capable(true);
    }
    if let Err(err) = controller.enable_irq_wake().await {
        warn!("cannot make irq wakeable: {}", err);
    }

    if config.enable_on_boot {
        controller.prepare(true).await;
    }
    controller.pulse_reset().await;

    info!("probe ok");
    Ok(controller)
}

fn resolve_failed(handle: Handle, name: &str, err: ResolveError) -> Error {
    error!("cannot get {}: {}", name, err);
    Error::from_resolve(handle, err)
}
