//! Power rail catalog and the regulator controller.
//!
//! Each sensor rail maps to exactly one regulator handle that is resolved at
//! bring-up and held for the lifetime of the controller. Enabling a rail
//! programs its voltage window and load current first; both are best effort so
//! a regulator without discrete voltage steps (or without load control) still
//! comes up.

use core::fmt;

use crate::error::{Error, HwError};

/// Number of rails feeding the sensor.
pub const RAIL_COUNT: usize = 3;

/// Identifier for the sensor supply rails.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    /// Analog supply, `vdd_ana`.
    AnalogSupply,
    /// SPI interface supply, `vcc_spi`.
    SpiSupply,
    /// Digital I/O supply, `vdd_io`.
    IoSupply,
}

impl Rail {
    /// Every rail in catalog order.
    pub const ALL: [Rail; RAIL_COUNT] = [Rail::AnalogSupply, Rail::SpiSupply, Rail::IoSupply];

    /// Deterministic index into [`RAIL_CONFIGS`] and per-rail handle tables.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Rail::AnalogSupply => 0,
            Rail::SpiSupply => 1,
            Rail::IoSupply => 2,
        }
    }

    /// Platform name of the regulator backing this rail.
    #[must_use]
    pub const fn name(self) -> &'static str {
        RAIL_CONFIGS[self.as_index()].name
    }

    /// Voltage and load settings applied when the rail is enabled.
    #[must_use]
    pub const fn config(self) -> RailConfig {
        RAIL_CONFIGS[self.as_index()]
    }

    /// Looks up a rail by its regulator name (`vdd_ana`, `vcc_spi`, `vdd_io`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Rail::ALL.into_iter().find(|rail| rail.name() == name)
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Electrical settings for one rail.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RailConfig {
    pub rail: Rail,
    pub name: &'static str,
    pub min_uv: u32,
    pub max_uv: u32,
    pub load_ua: u32,
}

impl RailConfig {
    pub const fn new(
        rail: Rail,
        name: &'static str,
        min_uv: u32,
        max_uv: u32,
        load_ua: u32,
    ) -> Self {
        Self {
            rail,
            name,
            min_uv,
            max_uv,
            load_ua,
        }
    }
}

/// Sensor supply voltage shared by every rail.
pub const SUPPLY_MICROVOLTS: u32 = 1_800_000;

/// Compile-time catalog of every rail, indexed by [`Rail::as_index`].
pub const RAIL_CONFIGS: [RailConfig; RAIL_COUNT] = [
    RailConfig::new(
        Rail::AnalogSupply,
        "vdd_ana",
        SUPPLY_MICROVOLTS,
        SUPPLY_MICROVOLTS,
        6_000,
    ),
    RailConfig::new(
        Rail::SpiSupply,
        "vcc_spi",
        SUPPLY_MICROVOLTS,
        SUPPLY_MICROVOLTS,
        10,
    ),
    RailConfig::new(
        Rail::IoSupply,
        "vdd_io",
        SUPPLY_MICROVOLTS,
        SUPPLY_MICROVOLTS,
        6_000,
    ),
];

/// Platform regulator consumer handle.
pub trait Regulator {
    /// Returns `true` when the regulator exposes discrete voltage levels.
    fn supports_voltage_levels(&self) -> bool;

    /// Programs the output voltage window.
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), HwError>;

    /// Declares the expected load current.
    fn set_load(&mut self, load_ua: u32) -> Result<(), HwError>;

    /// Turns the output on.
    fn enable(&mut self) -> Result<(), HwError>;

    /// Turns the output off.
    fn disable(&mut self) -> Result<(), HwError>;

    /// Reports whether the output is currently on.
    fn is_enabled(&self) -> bool;
}

/// Owns one regulator handle per rail.
pub struct RailController<R> {
    regulators: [Option<R>; RAIL_COUNT],
}

impl<R: Regulator> RailController<R> {
    /// Wraps handles indexed by [`Rail::as_index`]. `None` marks a rail
    /// without a backing regulator.
    pub const fn new(regulators: [Option<R>; RAIL_COUNT]) -> Self {
        Self { regulators }
    }

    /// Enables or disables a rail.
    ///
    /// Enabling returns the result of the final enable call; voltage and load
    /// failures are logged and skipped. Disabling only touches a regulator
    /// that reports itself on and always succeeds once the handle exists.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRail`] when the rail has no regulator handle, or
    /// [`Error::HardwareOperationFailed`] when the regulator refuses to turn on.
    pub fn set_rail(&mut self, rail: Rail, enable: bool) -> Result<(), Error> {
        let Some(regulator) = self.regulators[rail.as_index()].as_mut() else {
            error!("no regulator for {}", rail);
            return Err(Error::InvalidRail(rail));
        };

        if enable {
            let config = rail.config();
            if regulator.supports_voltage_levels()
                && let Err(err) = regulator.set_voltage(config.min_uv, config.max_uv)
            {
                error!("unable to set voltage on {}: {}", rail, err);
            }

            if let Err(err) = regulator.set_load(config.load_ua) {
                error!("unable to set current on {}: {}", rail, err);
            }

            regulator.enable().map_err(|err| {
                error!("error enabling {}: {}", rail, err);
                Error::HardwareOperationFailed(err)
            })
        } else {
            if regulator.is_enabled()
                && let Err(err) = regulator.disable()
            {
                warn!("error disabling {}: {}", rail, err);
            }
            Ok(())
        }
    }

    /// Reports the current output state, or `None` when the rail has no handle.
    pub fn is_enabled(&self, rail: Rail) -> Option<bool> {
        self.regulators[rail.as_index()]
            .as_ref()
            .map(Regulator::is_enabled)
    }
}
