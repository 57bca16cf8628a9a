//! Attribute dispatcher.
//!
//! Turns attribute reads and writes into controller calls. Parsing happens
//! before the controller is touched, so a rejected write never changes state.

use core::fmt::{self, Write};

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;

use super::catalog::{self, AttributeTag};
use super::grammar::{self, Command, ParseError};
use crate::controller::{Board, FpcController};
use crate::error::Error;

/// Capacity of a rendered attribute read.
pub const SHOW_CAPACITY: usize = 8;

/// Errors surfaced by attribute reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttributeError {
    Parse(ParseError),
    NotReadable(&'static str),
    Controller(Error),
}

impl From<ParseError> for AttributeError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<Error> for AttributeError {
    fn from(error: Error) -> Self {
        Self::Controller(error)
    }
}

impl From<AttributeError> for Error {
    fn from(error: AttributeError) -> Self {
        match error {
            AttributeError::Parse(ParseError::UnknownAttribute) => {
                Error::InvalidRequest("unknown attribute")
            }
            AttributeError::Parse(ParseError::InvalidValue { expected, .. }) => {
                Error::InvalidRequest(expected)
            }
            AttributeError::NotReadable(_) => Error::InvalidRequest("attribute is write-only"),
            AttributeError::Controller(error) => error,
        }
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::Parse(error) => write!(f, "{error}"),
            AttributeError::NotReadable(name) => write!(f, "{name} is write-only"),
            AttributeError::Controller(error) => write!(f, "{error}"),
        }
    }
}

/// Executes attribute requests against one controller.
pub struct AttributeExecutor<'a, M: RawMutex, B: Board> {
    controller: &'a FpcController<M, B>,
}

impl<'a, M: RawMutex, B: Board> AttributeExecutor<'a, M, B> {
    pub const fn new(controller: &'a FpcController<M, B>) -> Self {
        Self { controller }
    }

    /// Parses and applies a write of `value` to `attribute`.
    ///
    /// # Errors
    ///
    /// Parse failures are returned before any state changes; controller
    /// failures (missing rail, refused enable, failed selection) pass through.
    pub async fn store(&self, attribute: &str, value: &str) -> Result<Command, AttributeError> {
        let command = grammar::parse_store(attribute, value).inspect_err(|err| {
            debug!("rejected write to {}: {}", attribute, err);
        })?;
        self.execute(command).await?;
        Ok(command)
    }

    /// Applies an already parsed command.
    ///
    /// # Errors
    ///
    /// Controller failures for rail control and pin selection.
    pub async fn execute(&self, command: Command) -> Result<(), Error> {
        let controller = self.controller;
        match command {
            Command::SelectProfile(profile) => controller.select_profile(profile).await?,
            Command::Prepare(enable) => controller.prepare(enable).await,
            Command::SetRail { rail, enable } => controller.set_rail(rail, enable).await?,
            Command::ResetPulse => controller.pulse_reset().await,
            Command::ArmWake(allowed) => controller.arm_wake(allowed),
            Command::ClockEnable => trace!("clk_enable ignored"),
            Command::AckIrq => controller.ack_irq(),
            Command::FingerDownWait(enabled) => controller.set_finger_down_wait(enabled),
            Command::Proximity { covered } => controller.set_proximity(covered).await,
        }
        Ok(())
    }

    /// Renders a read of `attribute` the way a sysfs node would (`"1\n"`).
    ///
    /// # Errors
    ///
    /// [`AttributeError::NotReadable`] for write-only attributes, or the GPIO
    /// failure when the interrupt line cannot be read.
    pub async fn show(&self, attribute: &str) -> Result<String<SHOW_CAPACITY>, AttributeError> {
        let spec = catalog::lookup(attribute).ok_or(ParseError::UnknownAttribute)?;
        if !spec.access.readable() {
            return Err(AttributeError::NotReadable(spec.name));
        }

        let mut rendered = String::new();
        match spec.tag {
            AttributeTag::Irq => {
                let level = self.controller.read_irq_line().await?;
                // Two bytes always fit.
                let _ = writeln!(rendered, "{}", u8::from(level));
            }
            _ => return Err(AttributeError::NotReadable(spec.name)),
        }
        Ok(rendered)
    }
}
