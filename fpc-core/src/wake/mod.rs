//! Interrupt-context wake handling and event delivery.
//!
//! `on_interrupt` runs in the interrupt handler. It never takes the controller
//! lock: the armed flag and the hold deadline are atomics and the event is
//! posted through an interrupt-safe [`Signal`]. A waiting consumer sees the
//! most recent event; bursts collapse into one wake-up carrying the latest
//! sequence number.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::error::HwError;
use crate::telemetry::TimestampMicros;

/// How long the platform stays awake after an interrupt, in microseconds.
pub const WAKE_HOLD_MICROS: u64 = 400_000;

/// How long the platform stays awake after an interrupt.
pub const WAKE_HOLD: Duration = Duration::from_micros(WAKE_HOLD_MICROS);

/// Platform wake source able to keep the system out of suspend.
pub trait WakeSource {
    /// Keeps the system awake for `hold`, replacing any shorter pending hold.
    /// Must not block.
    fn stay_awake(&self, hold: Duration) -> Result<(), HwError>;
}

/// Notification posted for every sensor interrupt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqEvent {
    /// Number of interrupts seen so far, including this one.
    pub sequence: u32,
    pub at: TimestampMicros,
    /// Whether this interrupt renewed the wake hold.
    pub wake_held: bool,
}

/// Wake hold and notification state shared with the interrupt handler.
pub struct WakeNotifier<M: RawMutex, W> {
    source: W,
    armed: AtomicBool,
    hold_until: AtomicU64,
    interrupts: AtomicU32,
    hold_failures: AtomicU32,
    events: Signal<M, IrqEvent>,
}

impl<M: RawMutex, W: WakeSource> WakeNotifier<M, W> {
    /// Wake starts disarmed.
    pub const fn new(source: W) -> Self {
        Self {
            source,
            armed: AtomicBool::new(false),
            hold_until: AtomicU64::new(0),
            interrupts: AtomicU32::new(0),
            hold_failures: AtomicU32::new(0),
            events: Signal::new(),
        }
    }

    /// Allows or forbids interrupts from holding the system awake.
    pub fn arm(&self, allowed: bool) {
        self.armed.store(allowed, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Interrupt handler body.
    pub fn on_interrupt(&self, now: TimestampMicros) -> IrqEvent {
        let sequence = self.interrupts.fetch_add(1, Ordering::AcqRel).wrapping_add(1);

        let wake_held = self.is_armed() && self.renew_hold(now);

        let event = IrqEvent {
            sequence,
            at: now,
            wake_held,
        };
        self.events.signal(event);
        event
    }

    fn renew_hold(&self, now: TimestampMicros) -> bool {
        match self.source.stay_awake(WAKE_HOLD) {
            Ok(()) => {
                self.hold_until
                    .fetch_max(now.saturating_add(WAKE_HOLD_MICROS), Ordering::AcqRel);
                true
            }
            Err(err) => {
                self.hold_failures.fetch_add(1, Ordering::Relaxed);
                warn!("wake hold failed: {}", err);
                false
            }
        }
    }

    /// Returns `true` while a wake hold taken at or before `now` is still running.
    pub fn is_holding(&self, now: TimestampMicros) -> bool {
        now < self.hold_until.load(Ordering::Acquire)
    }

    /// Instant at which the current wake hold lapses (zero when none was taken).
    pub fn hold_deadline(&self) -> TimestampMicros {
        self.hold_until.load(Ordering::Acquire)
    }

    pub fn interrupt_count(&self) -> u32 {
        self.interrupts.load(Ordering::Acquire)
    }

    pub fn hold_failures(&self) -> u32 {
        self.hold_failures.load(Ordering::Relaxed)
    }

    /// Waits for the next interrupt notification.
    pub async fn wait(&self) -> IrqEvent {
        self.events.wait().await
    }

    /// Takes a pending notification without waiting.
    pub fn try_take(&self) -> Option<IrqEvent> {
        self.events.try_take()
    }

    pub fn source(&self) -> &W {
        &self.source
    }
}
