#![allow(dead_code)]

//! Recording mock board shared by the integration tests.
//!
//! Every platform call lands in one ordered log together with the virtual
//! time at which it happened. Delays advance the virtual clock and yield once
//! so concurrently joined futures get a chance to run.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal_async::delay::DelayNs;

use fpc_core::controller::{Board, BoardResources, FpcController, ResourceProvider};
use fpc_core::error::{HwError, ResolveError};
use fpc_core::gate::IrqLine;
use fpc_core::pins::{PinControl, PinProfile, PinProfileSelector};
use fpc_core::rails::{Rail, Regulator};
use fpc_core::telemetry::{Clock, TimestampMicros};
use fpc_core::wake::WakeSource;

pub const EIO: HwError = HwError::new(-5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwEvent {
    Select(PinProfile),
    SelectFailed(PinProfile),
    Voltage(Rail),
    Load(Rail),
    Enable(Rail),
    EnableFailed(Rail),
    Disable(Rail),
    IrqUnmask,
    IrqMask,
    IrqRead,
    IrqWake,
    StayAwake,
    Sleep(u32),
}

impl HwEvent {
    /// Voltage and load programming happen on every enable; most tests only
    /// care about the on/off edges.
    pub fn is_rail_setup(self) -> bool {
        matches!(self, HwEvent::Voltage(_) | HwEvent::Load(_))
    }
}

#[derive(Default)]
struct State {
    now: Cell<TimestampMicros>,
    log: RefCell<Vec<(TimestampMicros, HwEvent)>>,
    failing_profiles: RefCell<Vec<PinProfile>>,
    failing_rails: RefCell<Vec<Rail>>,
    irq_level: Cell<bool>,
    rails_on: RefCell<Vec<Rail>>,
}

/// Shared handle to the mock board state.
#[derive(Clone, Default)]
pub struct Harness {
    state: Rc<State>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> TimestampMicros {
        self.state.now.get()
    }

    pub fn advance(&self, micros: u64) {
        self.state.now.set(self.state.now.get() + micros);
    }

    fn push(&self, event: HwEvent) {
        self.state.log.borrow_mut().push((self.now(), event));
    }

    pub fn log(&self) -> Vec<(TimestampMicros, HwEvent)> {
        self.state.log.borrow().clone()
    }

    /// Logged events without timestamps or rail setup noise.
    pub fn events(&self) -> Vec<HwEvent> {
        self.state
            .log
            .borrow()
            .iter()
            .map(|(_, event)| *event)
            .filter(|event| !event.is_rail_setup())
            .collect()
    }

    pub fn clear(&self) {
        self.state.log.borrow_mut().clear();
    }

    pub fn fail_profile(&self, profile: PinProfile) {
        self.state.failing_profiles.borrow_mut().push(profile);
    }

    pub fn fail_rail(&self, rail: Rail) {
        self.state.failing_rails.borrow_mut().push(rail);
    }

    pub fn set_irq_level(&self, level: bool) {
        self.state.irq_level.set(level);
    }

    pub fn rails_on(&self) -> Vec<Rail> {
        self.state.rails_on.borrow().clone()
    }

    pub fn count(&self, event: HwEvent) -> usize {
        self.events().iter().filter(|logged| **logged == event).count()
    }

    pub fn regulator(&self, rail: Rail) -> MockRegulator {
        MockRegulator {
            rail,
            harness: self.clone(),
        }
    }

    pub fn resources(&self) -> BoardResources<MockBoard> {
        let pins = PinProfileSelector::resolve(MockPins {
            harness: self.clone(),
        })
        .expect("mock profiles resolve");

        BoardResources {
            regulators: Rail::ALL.map(|rail| Some(self.regulator(rail))),
            pins,
            irq: MockIrq {
                harness: self.clone(),
            },
            delay: MockDelay {
                harness: self.clone(),
            },
            wake: MockWake {
                harness: self.clone(),
            },
            clock: MockClock {
                harness: self.clone(),
            },
        }
    }

    pub fn controller(&self) -> TestController {
        FpcController::new(self.resources())
    }
}

pub type TestController = FpcController<NoopRawMutex, MockBoard>;

pub struct MockBoard;

impl Board for MockBoard {
    type Regulator = MockRegulator;
    type Pins = MockPins;
    type Irq = MockIrq;
    type Delay = MockDelay;
    type Wake = MockWake;
    type Clock = MockClock;
}

pub struct MockRegulator {
    rail: Rail,
    harness: Harness,
}

impl Regulator for MockRegulator {
    fn supports_voltage_levels(&self) -> bool {
        true
    }

    fn set_voltage(&mut self, _min_uv: u32, _max_uv: u32) -> Result<(), HwError> {
        self.harness.push(HwEvent::Voltage(self.rail));
        Ok(())
    }

    fn set_load(&mut self, _load_ua: u32) -> Result<(), HwError> {
        self.harness.push(HwEvent::Load(self.rail));
        Ok(())
    }

    fn enable(&mut self) -> Result<(), HwError> {
        if self.harness.state.failing_rails.borrow().contains(&self.rail) {
            self.harness.push(HwEvent::EnableFailed(self.rail));
            return Err(EIO);
        }
        self.harness.push(HwEvent::Enable(self.rail));
        let mut on = self.harness.state.rails_on.borrow_mut();
        if !on.contains(&self.rail) {
            on.push(self.rail);
        }
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HwError> {
        self.harness.push(HwEvent::Disable(self.rail));
        self.harness
            .state
            .rails_on
            .borrow_mut()
            .retain(|rail| *rail != self.rail);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.harness.state.rails_on.borrow().contains(&self.rail)
    }
}

pub struct MockPins {
    harness: Harness,
}

impl PinControl for MockPins {
    type State = PinProfile;

    fn lookup(&mut self, name: &str) -> Result<PinProfile, ResolveError> {
        PinProfile::from_name(name).ok_or(ResolveError::Absent)
    }

    fn select(&mut self, state: PinProfile) -> Result<(), HwError> {
        if self.harness.state.failing_profiles.borrow().contains(&state) {
            self.harness.push(HwEvent::SelectFailed(state));
            return Err(EIO);
        }
        self.harness.push(HwEvent::Select(state));
        Ok(())
    }
}

pub struct MockIrq {
    harness: Harness,
}

impl IrqLine for MockIrq {
    fn enable_irq(&mut self) {
        self.harness.push(HwEvent::IrqUnmask);
    }

    fn disable_irq(&mut self) {
        self.harness.push(HwEvent::IrqMask);
    }

    fn level(&mut self) -> Result<bool, HwError> {
        self.harness.push(HwEvent::IrqRead);
        Ok(self.harness.state.irq_level.get())
    }

    fn enable_wake(&mut self) -> Result<(), HwError> {
        self.harness.push(HwEvent::IrqWake);
        Ok(())
    }
}

pub struct MockDelay {
    harness: Harness,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1_000)).await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.harness.push(HwEvent::Sleep(us));
        self.harness.advance(u64::from(us));
        yield_now().await;
    }
}

pub struct MockWake {
    harness: Harness,
}

impl WakeSource for MockWake {
    fn stay_awake(&self, hold: Duration) -> Result<(), HwError> {
        assert_eq!(hold, fpc_core::wake::WAKE_HOLD);
        self.harness.push(HwEvent::StayAwake);
        Ok(())
    }
}

pub struct MockClock {
    harness: Harness,
}

impl Clock for MockClock {
    fn now_micros(&self) -> TimestampMicros {
        self.harness.now()
    }
}

/// Resource provider backed by the harness, with knobs for bring-up failures.
pub struct MockProvider {
    pub harness: Harness,
    pub missing_regulator: Option<Rail>,
    pub unready_regulator: Option<Rail>,
    pub pin_control: Result<(), ResolveError>,
    pub missing_profile: Option<PinProfile>,
    pub irq: Result<(), ResolveError>,
    pub wakeup_capable: Rc<Cell<bool>>,
}

impl MockProvider {
    pub fn new(harness: &Harness) -> Self {
        Self {
            harness: harness.clone(),
            missing_regulator: None,
            unready_regulator: None,
            pin_control: Ok(()),
            missing_profile: None,
            irq: Ok(()),
            wakeup_capable: Rc::new(Cell::new(false)),
        }
    }
}

/// Pin control that hides one profile.
pub struct PartialPins {
    inner: MockPins,
    missing: Option<PinProfile>,
}

impl PinControl for PartialPins {
    type State = PinProfile;

    fn lookup(&mut self, name: &str) -> Result<PinProfile, ResolveError> {
        let profile = self.inner.lookup(name)?;
        if self.missing == Some(profile) {
            return Err(ResolveError::Absent);
        }
        Ok(profile)
    }

    fn select(&mut self, state: PinProfile) -> Result<(), HwError> {
        self.inner.select(state)
    }
}

pub struct ProvidedBoard;

impl Board for ProvidedBoard {
    type Regulator = MockRegulator;
    type Pins = PartialPins;
    type Irq = MockIrq;
    type Delay = MockDelay;
    type Wake = MockWake;
    type Clock = MockClock;
}

impl ResourceProvider for MockProvider {
    type Board = ProvidedBoard;

    fn regulator(&mut self, name: &str) -> Result<MockRegulator, ResolveError> {
        let rail = Rail::from_name(name).ok_or(ResolveError::Absent)?;
        if self.missing_regulator == Some(rail) {
            return Err(ResolveError::Absent);
        }
        if self.unready_regulator == Some(rail) {
            return Err(ResolveError::NotReady);
        }
        Ok(self.harness.regulator(rail))
    }

    fn irq_line(&mut self, label: &str) -> Result<MockIrq, ResolveError> {
        assert_eq!(label, "fpc,gpio_irq");
        self.irq.map(|()| MockIrq {
            harness: self.harness.clone(),
        })
    }

    fn claim_gpio(&mut self, label: &str) -> Result<(), ResolveError> {
        assert_eq!(label, "fpc,gpio_rst");
        Ok(())
    }

    fn pin_control(&mut self) -> Result<PartialPins, ResolveError> {
        self.pin_control.map(|()| PartialPins {
            inner: MockPins {
                harness: self.harness.clone(),
            },
            missing: self.missing_profile,
        })
    }

    fn wake_source(&mut self) -> Result<MockWake, ResolveError> {
        Ok(MockWake {
            harness: self.harness.clone(),
        })
    }

    fn set_wakeup_capable(&mut self, capable: bool) {
        self.wakeup_capable.set(capable);
    }

    fn delay(&mut self) -> MockDelay {
        MockDelay {
            harness: self.harness.clone(),
        }
    }

    fn clock(&mut self) -> MockClock {
        MockClock {
            harness: self.harness.clone(),
        }
    }
}
