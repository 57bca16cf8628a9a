//! Attribute catalog: names, access modes and value layouts.
//!
//! The parser, the executor and the emulator help text all read this table so
//! the exposed surface stays in one place.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttributeTag {
    PinctlSet,
    DevicePrepare,
    RegulatorEnable,
    HwReset,
    WakeupEnable,
    ClkEnable,
    Irq,
    FingerdownWait,
    ProximityState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub const fn readable(self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// Layout of the value written to an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    /// Pin profile name, short or platform form.
    ProfileName,
    /// `enable` or `disable`.
    Toggle,
    /// `<rail>,<e|d>`.
    RailToggle,
    /// The literal `reset`.
    ResetKeyword,
    /// Any value, ignored.
    Any,
    /// Signed decimal integer.
    SignedInteger,
}

impl ValueSpec {
    /// Short description used in error messages and help output.
    pub const fn expected(self) -> &'static str {
        match self {
            ValueSpec::ProfileName => "reset-reset|reset-active|irq-active",
            ValueSpec::Toggle => "enable|disable",
            ValueSpec::RailToggle => "<vdd_ana|vcc_spi|vdd_io>,<e|d>",
            ValueSpec::ResetKeyword => "reset",
            ValueSpec::Any => "any value",
            ValueSpec::SignedInteger => "signed decimal integer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub tag: AttributeTag,
    pub access: Access,
    pub value: ValueSpec,
    pub help: &'static str,
}

impl AttributeSpec {
    const fn new(
        name: &'static str,
        tag: AttributeTag,
        access: Access,
        value: ValueSpec,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            tag,
            access,
            value,
            help,
        }
    }
}

pub static ATTRIBUTES: [AttributeSpec; 9] = [
    AttributeSpec::new(
        "pinctl_set",
        AttributeTag::PinctlSet,
        Access::WriteOnly,
        ValueSpec::ProfileName,
        "select a pin profile",
    ),
    AttributeSpec::new(
        "device_prepare",
        AttributeTag::DevicePrepare,
        Access::WriteOnly,
        ValueSpec::Toggle,
        "power the sensor up or down",
    ),
    AttributeSpec::new(
        "regulator_enable",
        AttributeTag::RegulatorEnable,
        Access::WriteOnly,
        ValueSpec::RailToggle,
        "switch one supply rail",
    ),
    AttributeSpec::new(
        "hw_reset",
        AttributeTag::HwReset,
        Access::WriteOnly,
        ValueSpec::ResetKeyword,
        "pulse the reset line",
    ),
    AttributeSpec::new(
        "wakeup_enable",
        AttributeTag::WakeupEnable,
        Access::WriteOnly,
        ValueSpec::Toggle,
        "allow interrupts to hold the system awake",
    ),
    AttributeSpec::new(
        "clk_enable",
        AttributeTag::ClkEnable,
        Access::WriteOnly,
        ValueSpec::Any,
        "legacy clock control, accepted and ignored",
    ),
    AttributeSpec::new(
        "irq",
        AttributeTag::Irq,
        Access::ReadWrite,
        ValueSpec::Any,
        "read the interrupt line; write to acknowledge",
    ),
    AttributeSpec::new(
        "fingerdown_wait",
        AttributeTag::FingerdownWait,
        Access::WriteOnly,
        ValueSpec::Toggle,
        "mark that a finger-down wait is in progress",
    ),
    AttributeSpec::new(
        "proximity_state",
        AttributeTag::ProximityState,
        Access::WriteOnly,
        ValueSpec::SignedInteger,
        "proximity sensor state, non-zero when covered",
    ),
];

/// Finds an attribute by exact name.
pub fn lookup(name: &str) -> Option<&'static AttributeSpec> {
    ATTRIBUTES.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        for (index, spec) in ATTRIBUTES.iter().enumerate() {
            assert!(
                ATTRIBUTES[index + 1..]
                    .iter()
                    .all(|other| other.name != spec.name),
                "duplicate attribute {}",
                spec.name
            );
        }
    }

    #[test]
    fn only_irq_is_readable() {
        let readable: Vec<&str> = ATTRIBUTES
            .iter()
            .filter(|spec| spec.access.readable())
            .map(|spec| spec.name)
            .collect();
        assert_eq!(readable, ["irq"]);
        assert_eq!(lookup("irq").map(|spec| spec.tag), Some(AttributeTag::Irq));
        assert!(lookup("IRQ").is_none());
    }
}
