//! Value grammar for attribute writes.
//!
//! Values are short, single-token strings, so the parsers run `winnow`
//! combinators straight over the `&str`. A single trailing newline (as left by
//! `echo`) is dropped before parsing; anything else must match exactly.

use core::fmt;

use winnow::ascii::dec_int;
use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::{literal, rest, take_till};

use super::catalog::{self, AttributeTag};
use crate::pins::PinProfile;
use crate::rails::Rail;

/// Longest rail name accepted by `regulator_enable`.
pub const MAX_RAIL_NAME: usize = 15;

/// Parsed attribute write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SelectProfile(PinProfile),
    Prepare(bool),
    SetRail { rail: Rail, enable: bool },
    ResetPulse,
    ArmWake(bool),
    ClockEnable,
    AckIrq,
    FingerDownWait(bool),
    Proximity { covered: bool },
}

/// Errors raised before any state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    UnknownAttribute,
    InvalidValue {
        attribute: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownAttribute => f.write_str("unknown attribute"),
            ParseError::InvalidValue {
                attribute,
                expected,
            } => write!(f, "{attribute} expects {expected}"),
        }
    }
}

fn toggle(input: &mut &str) -> ModalResult<bool> {
    alt(("enable".value(true), "disable".value(false))).parse_next(input)
}

fn profile(input: &mut &str) -> ModalResult<PinProfile> {
    rest.verify_map(PinProfile::from_name).parse_next(input)
}

/// `<rail>,<e|d>`; characters after the operation letter are ignored.
fn rail_toggle(input: &mut &str) -> ModalResult<(Rail, bool)> {
    (
        take_till(1..=MAX_RAIL_NAME, ',').verify_map(Rail::from_name),
        ',',
        alt(('e'.value(true), 'd'.value(false))),
        rest,
    )
        .map(|(rail, _, enable, _)| (rail, enable))
        .parse_next(input)
}

fn reset_keyword(input: &mut &str) -> ModalResult<()> {
    literal("reset").void().parse_next(input)
}

fn covered(input: &mut &str) -> ModalResult<bool> {
    dec_int.map(|value: i32| value != 0).parse_next(input)
}

/// Parses a write of `value` to `attribute`.
///
/// # Errors
///
/// [`ParseError::UnknownAttribute`] for names outside the catalog, or
/// [`ParseError::InvalidValue`] when the value does not match the
/// attribute's layout.
pub fn parse_store(attribute: &str, value: &str) -> Result<Command, ParseError> {
    let spec = catalog::lookup(attribute).ok_or(ParseError::UnknownAttribute)?;
    let value = value.strip_suffix('\n').unwrap_or(value);

    let parsed = match spec.tag {
        AttributeTag::PinctlSet => profile.parse(value).map(Command::SelectProfile),
        AttributeTag::DevicePrepare => toggle.parse(value).map(Command::Prepare),
        AttributeTag::RegulatorEnable => rail_toggle
            .parse(value)
            .map(|(rail, enable)| Command::SetRail { rail, enable }),
        AttributeTag::HwReset => reset_keyword.parse(value).map(|()| Command::ResetPulse),
        AttributeTag::WakeupEnable => toggle.parse(value).map(Command::ArmWake),
        AttributeTag::ClkEnable => Ok(Command::ClockEnable),
        AttributeTag::Irq => Ok(Command::AckIrq),
        AttributeTag::FingerdownWait => toggle.parse(value).map(Command::FingerDownWait),
        AttributeTag::ProximityState => covered
            .parse(value)
            .map(|covered| Command::Proximity { covered }),
    };

    parsed.map_err(|_| ParseError::InvalidValue {
        attribute: spec.name,
        expected: spec.value.expected(),
    })
}
