//! The sensor control plane.
//!
//! [`FpcController`] owns every platform handle behind one async mutex. The
//! power sequencer, reset sequencer, rail control, pin selection and interrupt
//! gate all run under that lock, so a caller never observes a half-applied
//! electrical state. A running sequence is tracked inside the lock; if its
//! future is dropped, the next lock acquisition finishes the remaining steps
//! before doing anything else. The wake notifier and the clock live outside
//! the lock so the interrupt handler can post events without waiting on a
//! sequence.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embedded_hal_async::delay::DelayNs;
use portable_atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::gate::{DisplayState, GateState, InterruptGate, IrqLine};
use crate::pins::{PinControl, PinProfile, PinProfileSelector};
use crate::rails::{RAIL_COUNT, Rail, RailController, Regulator};
use crate::sequences::power::POWER_OFF_ORDER;
use crate::sequences::{
    POWER_OFF_TEMPLATE, POWER_ON_TEMPLATE, RESET_PULSE_TEMPLATE, SequenceAction, SequenceKind,
    SequenceTemplate,
};
use crate::telemetry::{
    Clock, TelemetryEventKind, TelemetryPayload, TelemetryRecorder, TimestampMicros,
};
use crate::wake::{IrqEvent, WakeNotifier, WakeSource};

pub mod probe;
mod status;

pub use probe::{BoardConfig, ResourceProvider, probe};
pub use status::StatusSnapshot;

/// Platform collaborators the controller is generic over.
pub trait Board {
    type Regulator: Regulator;
    type Pins: PinControl;
    type Irq: IrqLine;
    type Delay: DelayNs;
    type Wake: WakeSource;
    type Clock: Clock;
}

/// Resolved handles handed to [`FpcController::new`].
pub struct BoardResources<B: Board> {
    /// Indexed by [`Rail::as_index`].
    pub regulators: [Option<B::Regulator>; RAIL_COUNT],
    pub pins: PinProfileSelector<B::Pins>,
    pub irq: B::Irq,
    pub delay: B::Delay,
    pub wake: B::Wake,
    pub clock: B::Clock,
}

/// Progress of a sequence that has started but not yet completed.
#[derive(Copy, Clone)]
struct PendingSequence {
    template: SequenceTemplate,
    next_step: usize,
    /// The current step was applied and only its hold remains.
    holding: bool,
    started_at: TimestampMicros,
    faults: usize,
}

struct Inner<B: Board> {
    rails: RailController<B::Regulator>,
    pins: PinProfileSelector<B::Pins>,
    gate: InterruptGate<B::Irq>,
    delay: B::Delay,
    prepared: bool,
    pending: Option<PendingSequence>,
    telemetry: TelemetryRecorder,
}

/// Electrical control plane for one sensor instance.
pub struct FpcController<M: RawMutex, B: Board> {
    inner: Mutex<M, Inner<B>>,
    notifier: WakeNotifier<M, B::Wake>,
    clock: B::Clock,
    wait_finger_down: AtomicBool,
}

impl<M: RawMutex, B: Board> FpcController<M, B> {
    /// Builds an unprepared controller with the interrupt unmasked and wake
    /// disarmed.
    pub fn new(resources: BoardResources<B>) -> Self {
        let BoardResources {
            regulators,
            pins,
            irq,
            delay,
            wake,
            clock,
        } = resources;

        Self {
            inner: Mutex::new(Inner {
                rails: RailController::new(regulators),
                pins,
                gate: InterruptGate::new(irq),
                delay,
                prepared: false,
                pending: None,
                telemetry: TelemetryRecorder::new(),
            }),
            notifier: WakeNotifier::new(wake),
            clock,
            wait_finger_down: AtomicBool::new(false),
        }
    }

    /// Takes the lock and completes any sequence whose caller went away.
    async fn lock(&self) -> MutexGuard<'_, M, Inner<B>> {
        let mut inner = self.inner.lock().await;
        if inner.pending.is_some() {
            debug!("finishing interrupted sequence");
            inner.resume(&self.clock).await;
        }
        inner
    }

    /// Powers the sensor up (`enable`) or down.
    ///
    /// Power-up holds reset, brings up `vcc_spi`, `vdd_io`, `vdd_ana`, waits
    /// for the rails to settle and releases reset. Power-down runs the mirror
    /// image. Requests that match the current state are no-ops. Individual
    /// rail or pin failures are logged and recorded but never abort the
    /// sequence. The prepared flag flips when the sequence completes, even if
    /// this future is dropped part way (see [`FpcController`]).
    pub async fn prepare(&self, enable: bool) {
        let mut inner = self.lock().await;
        match (enable, inner.prepared) {
            (true, false) => {
                inner.run(POWER_ON_TEMPLATE, &self.clock).await;
                info!("sensor prepared");
            }
            (false, true) => {
                inner.run(POWER_OFF_TEMPLATE, &self.clock).await;
                info!("sensor unprepared");
            }
            _ => debug!("prepare({}) already applied", enable),
        }
    }

    /// Runs the timed reset pulse. The reset line always ends released.
    pub async fn pulse_reset(&self) {
        let mut inner = self.lock().await;
        inner.run(RESET_PULSE_TEMPLATE, &self.clock).await;
    }

    /// Enables or disables one rail outside of a sequence.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRail`] when the rail has no regulator, or the enable
    /// failure reported by the regulator.
    pub async fn set_rail(&self, rail: Rail, enable: bool) -> Result<(), Error> {
        let mut inner = self.lock().await;
        let now = self.clock.now_micros();
        inner.set_rail(rail, enable, now)
    }

    /// Applies a pin profile outside of a sequence.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareOperationFailed`] when the provider rejects the state.
    pub async fn select_profile(&self, profile: PinProfile) -> Result<(), Error> {
        let mut inner = self.lock().await;
        let now = self.clock.now_micros();
        inner.select_profile(profile, now)
    }

    /// Display blank/unblank observer.
    pub async fn on_display_state_changed(&self, display: DisplayState) {
        let mut inner = self.lock().await;
        let now = self.clock.now_micros();
        inner.telemetry.record(
            TelemetryEventKind::DisplayChanged(display),
            TelemetryPayload::None,
            now,
        );
        let changed = inner.gate.on_display_state(display);
        inner.record_gate_change(changed, now);
    }

    /// Framebuffer blank notifier entry point. Unknown codes are ignored.
    pub async fn on_fb_blank(&self, code: i32) {
        match DisplayState::from_fb_blank(code) {
            Some(display) => self.on_display_state_changed(display).await,
            None => trace!("ignoring blank code {}", code),
        }
    }

    /// Proximity sensor update; `covered` means something is near the sensor.
    pub async fn set_proximity(&self, covered: bool) {
        let mut inner = self.lock().await;
        let now = self.clock.now_micros();
        inner.telemetry.record(
            TelemetryEventKind::ProximityChanged,
            TelemetryPayload::Level(covered),
            now,
        );
        let changed = inner.gate.set_proximity(covered);
        inner.record_gate_change(changed, now);
    }

    /// Reads the interrupt line level.
    ///
    /// # Errors
    ///
    /// [`Error::HardwareOperationFailed`] when the GPIO read fails.
    pub async fn read_irq_line(&self) -> Result<bool, Error> {
        let mut inner = self.lock().await;
        Ok(inner.gate.line_mut().level()?)
    }

    /// Registers the interrupt line as a system wake source.
    pub(crate) async fn enable_irq_wake(&self) -> Result<(), Error> {
        let mut inner = self.lock().await;
        Ok(inner.gate.line_mut().enable_wake()?)
    }

    /// Interrupt acknowledgement used for latency measurement; always succeeds.
    pub fn ack_irq(&self) {
        trace!("irq ack");
    }

    /// Allows or forbids interrupts from holding the system awake.
    pub fn arm_wake(&self, allowed: bool) {
        self.notifier.arm(allowed);
        debug!("wake on irq {}", allowed);
    }

    pub fn set_finger_down_wait(&self, enabled: bool) {
        self.wait_finger_down.store(enabled, Ordering::Release);
    }

    pub fn finger_down_wait(&self) -> bool {
        self.wait_finger_down.load(Ordering::Acquire)
    }

    /// Interrupt handler body. Never blocks and never takes the lock.
    pub fn on_interrupt(&self) -> IrqEvent {
        self.notifier.on_interrupt(self.clock.now_micros())
    }

    /// Waits for the next interrupt notification.
    pub async fn wait_irq(&self) -> IrqEvent {
        self.notifier.wait().await
    }

    pub fn notifier(&self) -> &WakeNotifier<M, B::Wake> {
        &self.notifier
    }

    pub async fn is_prepared(&self) -> bool {
        self.lock().await.prepared
    }

    pub async fn gate_state(&self) -> GateState {
        self.lock().await.gate.state()
    }

    /// Point-in-time view of the controller state.
    pub async fn status(&self) -> StatusSnapshot {
        let inner = self.lock().await;
        let now = self.clock.now_micros();
        StatusSnapshot {
            prepared: inner.prepared,
            gate: inner.gate.state(),
            wake_armed: self.notifier.is_armed(),
            wake_holding: self.notifier.is_holding(now),
            finger_down_wait: self.finger_down_wait(),
            rails: Rail::ALL.map(|rail| inner.rails.is_enabled(rail)),
            last_profile: inner.pins.last_selected(),
            interrupts: self.notifier.interrupt_count(),
            wake_hold_failures: self.notifier.hold_failures(),
        }
    }

    /// Runs `inspect` against the telemetry ring while holding the lock.
    pub async fn with_telemetry<R>(&self, inspect: impl FnOnce(&TelemetryRecorder) -> R) -> R {
        let inner = self.lock().await;
        inspect(&inner.telemetry)
    }

    /// Turns every rail off and marks the sensor unprepared. Used on driver
    /// removal.
    pub async fn release(&self) {
        let mut inner = self.lock().await;
        for rail in POWER_OFF_ORDER {
            let now = self.clock.now_micros();
            // Failures are already logged and recorded.
            let _ = inner.set_rail(rail, false, now);
        }
        inner.prepared = false;
        info!("sensor released");
    }
}

impl<B: Board> Inner<B> {
    async fn run(&mut self, template: SequenceTemplate, clock: &B::Clock) {
        let started_at = clock.now_micros();
        self.telemetry.record(
            TelemetryEventKind::SequenceStarted(template.kind),
            TelemetryPayload::None,
            started_at,
        );
        self.pending = Some(PendingSequence {
            template,
            next_step: 0,
            holding: false,
            started_at,
            faults: 0,
        });
        self.resume(clock).await;
    }

    /// Walks the pending sequence to its end. Progress is stored before every
    /// await, so a dropped caller leaves a sequence that can be resumed
    /// without repeating an applied step. An interrupted hold restarts.
    async fn resume(&mut self, clock: &B::Clock) {
        while let Some(mut pending) = self.pending {
            let Some(step) = pending.template.steps().get(pending.next_step) else {
                self.pending = None;
                self.complete(pending, clock.now_micros());
                return;
            };

            if !pending.holding {
                if self.apply(step.action, clock.now_micros()).is_err() {
                    pending.faults += 1;
                }
                pending.holding = true;
                self.pending = Some(pending);
            }
            if !step.hold_for.is_zero() {
                self.delay.delay_us(hold_micros(step.hold_for)).await;
            }

            pending.holding = false;
            pending.next_step += 1;
            self.pending = Some(pending);
        }
    }

    fn complete(&mut self, pending: PendingSequence, now: TimestampMicros) {
        let PendingSequence {
            template,
            started_at,
            faults,
            ..
        } = pending;
        match template.kind {
            SequenceKind::PowerOn => self.prepared = true,
            SequenceKind::PowerOff => self.prepared = false,
            SequenceKind::ResetPulse => {}
        }

        if faults > 0 {
            warn!("{} finished with {} fault(s)", template.kind, faults);
        } else {
            debug!("{} complete", template.kind);
        }
        self.telemetry
            .record_sequence_completion(template.kind, started_at, now, faults);
    }

    fn apply(&mut self, action: SequenceAction, now: TimestampMicros) -> Result<(), Error> {
        match action {
            SequenceAction::SelectProfile(profile) => self.select_profile(profile, now),
            SequenceAction::EnableRail(rail) => self.set_rail(rail, true, now),
            SequenceAction::DisableRail(rail) => self.set_rail(rail, false, now),
            SequenceAction::SampleIrq => {
                let level = self.gate.line_mut().level().map_err(|err| {
                    warn!("irq sample failed: {}", err);
                    Error::from(err)
                })?;
                self.telemetry.record(
                    TelemetryEventKind::IrqSampled,
                    TelemetryPayload::Level(level),
                    now,
                );
                Ok(())
            }
        }
    }

    fn select_profile(&mut self, profile: PinProfile, now: TimestampMicros) -> Result<(), Error> {
        let outcome = self.pins.select(profile);
        self.telemetry.record_profile(profile, outcome, now);
        outcome
    }

    fn set_rail(&mut self, rail: Rail, enable: bool, now: TimestampMicros) -> Result<(), Error> {
        let outcome = self.rails.set_rail(rail, enable);
        self.telemetry.record_rail(rail, enable, outcome, now);
        outcome
    }

    fn record_gate_change(&mut self, changed: bool, now: TimestampMicros) {
        if !changed {
            return;
        }
        let event = if self.gate.state().irq_enabled {
            TelemetryEventKind::IrqUnmasked
        } else {
            TelemetryEventKind::IrqMasked
        };
        debug!("{}", event);
        self.telemetry.record(event, TelemetryPayload::None, now);
    }
}

fn hold_micros(hold: Duration) -> u32 {
    u32::try_from(hold.as_micros()).unwrap_or(u32::MAX)
}
