//! Simulated platform handed to the control plane.
//!
//! Every call the controller makes lands in the shared [`SimState`] as a
//! narrated line; the session drains and prints them after each command.
//! Delays really sleep so telemetry timestamps show host timings.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal_async::delay::DelayNs;
use fpc_core::controller::{Board, ResourceProvider};
use fpc_core::error::{HwError, ResolveError};
use fpc_core::gate::IrqLine;
use fpc_core::pins::{PinControl, PinProfile};
use fpc_core::rails::{RAIL_COUNT, Rail, Regulator};
use fpc_core::telemetry::{Clock, TimestampMicros};
use fpc_core::wake::WakeSource;

/// `-EIO`, returned by injected failures.
const EIO: HwError = HwError::new(-5);

/// Failure injection knobs taken from the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    pub failing_rail: Option<Rail>,
    pub failing_profile: Option<PinProfile>,
    /// Number of probe attempts that see pin control as not ready.
    pub pinctrl_deferrals: u32,
}

#[derive(Debug, Default)]
pub struct SimState {
    pending: Vec<String>,
    rails_on: [bool; RAIL_COUNT],
    irq_level: bool,
    irq_masked: bool,
    wakeup_capable: bool,
    faults: Faults,
}

impl SimState {
    fn note(&mut self, line: String) {
        self.pending.push(line);
    }

    /// Takes the hardware lines produced since the last call.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    pub fn irq_level(&self) -> bool {
        self.irq_level
    }

    pub fn set_irq_level(&mut self, level: bool) {
        self.irq_level = level;
    }

    /// Whether the interrupt controller currently drops sensor interrupts.
    pub fn irq_masked(&self) -> bool {
        self.irq_masked
    }

    pub fn wakeup_capable(&self) -> bool {
        self.wakeup_capable
    }
}

pub type Shared = Rc<RefCell<SimState>>;

pub fn shared(faults: Faults) -> Shared {
    Rc::new(RefCell::new(SimState {
        faults,
        ..SimState::default()
    }))
}

pub struct SimBoard;

impl Board for SimBoard {
    type Regulator = SimRegulator;
    type Pins = SimPins;
    type Irq = SimIrq;
    type Delay = SimDelay;
    type Wake = SimWake;
    type Clock = SimClock;
}

pub struct SimRegulator {
    rail: Rail,
    state: Shared,
}

impl Regulator for SimRegulator {
    fn supports_voltage_levels(&self) -> bool {
        true
    }

    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), HwError> {
        self.state
            .borrow_mut()
            .note(format!("{}: voltage {min_uv}..{max_uv} uV", self.rail));
        Ok(())
    }

    fn set_load(&mut self, load_ua: u32) -> Result<(), HwError> {
        self.state
            .borrow_mut()
            .note(format!("{}: load {load_ua} uA", self.rail));
        Ok(())
    }

    fn enable(&mut self) -> Result<(), HwError> {
        let mut state = self.state.borrow_mut();
        if state.faults.failing_rail == Some(self.rail) {
            state.note(format!("{}: enable failed ({EIO})", self.rail));
            return Err(EIO);
        }
        state.rails_on[self.rail.as_index()] = true;
        state.note(format!("{}: on", self.rail));
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HwError> {
        let mut state = self.state.borrow_mut();
        state.rails_on[self.rail.as_index()] = false;
        state.note(format!("{}: off", self.rail));
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.state.borrow().rails_on[self.rail.as_index()]
    }
}

pub struct SimPins {
    state: Shared,
}

impl PinControl for SimPins {
    type State = PinProfile;

    fn lookup(&mut self, name: &str) -> Result<PinProfile, ResolveError> {
        PinProfile::from_name(name).ok_or(ResolveError::Absent)
    }

    fn select(&mut self, profile: PinProfile) -> Result<(), HwError> {
        let mut state = self.state.borrow_mut();
        if state.faults.failing_profile == Some(profile) {
            state.note(format!(
                "pinctrl: {} failed ({EIO})",
                profile.platform_name()
            ));
            return Err(EIO);
        }
        state.note(format!("pinctrl: {}", profile.platform_name()));
        Ok(())
    }
}

pub struct SimIrq {
    state: Shared,
}

impl IrqLine for SimIrq {
    fn enable_irq(&mut self) {
        let mut state = self.state.borrow_mut();
        state.irq_masked = false;
        state.note("irq: unmasked".to_owned());
    }

    fn disable_irq(&mut self) {
        let mut state = self.state.borrow_mut();
        state.irq_masked = true;
        state.note("irq: masked".to_owned());
    }

    fn level(&mut self) -> Result<bool, HwError> {
        Ok(self.state.borrow().irq_level)
    }

    fn enable_wake(&mut self) -> Result<(), HwError> {
        self.state
            .borrow_mut()
            .note("irq: wake source registered".to_owned());
        Ok(())
    }
}

pub struct SimDelay {
    state: Shared,
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    async fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().note(format!("delay {us}us"));
        thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

pub struct SimWake {
    state: Shared,
}

impl WakeSource for SimWake {
    fn stay_awake(&self, hold: Duration) -> Result<(), HwError> {
        self.state
            .borrow_mut()
            .note(format!("wake: stay awake {}ms", hold.as_millis()));
        Ok(())
    }
}

/// Microseconds since the emulator started.
#[derive(Clone, Copy)]
pub struct SimClock {
    origin: Instant,
}

impl Clock for SimClock {
    fn now_micros(&self) -> TimestampMicros {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Hands out handles backed by one shared [`SimState`].
pub struct SimProvider {
    state: Shared,
    origin: Instant,
}

impl SimProvider {
    pub fn new(state: &Shared, origin: Instant) -> Self {
        Self {
            state: Rc::clone(state),
            origin,
        }
    }
}

impl ResourceProvider for SimProvider {
    type Board = SimBoard;

    fn regulator(&mut self, name: &str) -> Result<SimRegulator, ResolveError> {
        let rail = Rail::from_name(name).ok_or(ResolveError::Absent)?;
        Ok(SimRegulator {
            rail,
            state: Rc::clone(&self.state),
        })
    }

    fn irq_line(&mut self, label: &str) -> Result<SimIrq, ResolveError> {
        self.state.borrow_mut().note(format!("gpio: claimed {label}"));
        Ok(SimIrq {
            state: Rc::clone(&self.state),
        })
    }

    fn claim_gpio(&mut self, label: &str) -> Result<(), ResolveError> {
        self.state.borrow_mut().note(format!("gpio: claimed {label}"));
        Ok(())
    }

    fn pin_control(&mut self) -> Result<SimPins, ResolveError> {
        let mut state = self.state.borrow_mut();
        if state.faults.pinctrl_deferrals > 0 {
            state.faults.pinctrl_deferrals -= 1;
            return Err(ResolveError::NotReady);
        }
        Ok(SimPins {
            state: Rc::clone(&self.state),
        })
    }

    fn wake_source(&mut self) -> Result<SimWake, ResolveError> {
        Ok(SimWake {
            state: Rc::clone(&self.state),
        })
    }

    fn set_wakeup_capable(&mut self, capable: bool) {
        let mut state = self.state.borrow_mut();
        state.wakeup_capable = capable;
        state.note(format!("device: wakeup capable {capable}"));
    }

    fn delay(&mut self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }

    fn clock(&mut self) -> SimClock {
        SimClock {
            origin: self.origin,
        }
    }
}
