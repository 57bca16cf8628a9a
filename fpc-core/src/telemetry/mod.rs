//! Telemetry ring for electrical transitions.
//!
//! Sequences are best effort: a rail or pin failure is logged and the sequence
//! carries on, so callers only ever see overall success. The ring keeps the
//! individual transitions (and faults) with microsecond timestamps so that a
//! failed bring-up can still be diagnosed after the fact. Pin transitions also
//! carry the time elapsed since the previous pin transition, which is what the
//! reset timing checks look at.

use core::{fmt, time::Duration};

use heapless::HistoryBuf;

use crate::error::Error;
use crate::gate::DisplayState;
use crate::pins::PinProfile;
use crate::rails::Rail;
use crate::sequences::SequenceKind;

/// Canonical timestamp units for telemetry records (microseconds).
pub type TimestampMicros = u64;

/// Identifier used when tracking emitted telemetry events.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic microsecond clock.
pub trait Clock {
    fn now_micros(&self) -> TimestampMicros;
}

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryEventKind {
    ProfileSelected(PinProfile),
    ProfileFailed(PinProfile),
    RailEnabled(Rail),
    RailDisabled(Rail),
    RailFault(Rail),
    IrqSampled,
    IrqUnmasked,
    IrqMasked,
    SequenceStarted(SequenceKind),
    SequenceComplete(SequenceKind),
    DisplayChanged(DisplayState),
    ProximityChanged,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::ProfileSelected(profile) => write!(f, "profile-selected {profile}"),
            TelemetryEventKind::ProfileFailed(profile) => write!(f, "profile-failed {profile}"),
            TelemetryEventKind::RailEnabled(rail) => write!(f, "rail-enabled {rail}"),
            TelemetryEventKind::RailDisabled(rail) => write!(f, "rail-disabled {rail}"),
            TelemetryEventKind::RailFault(rail) => write!(f, "rail-fault {rail}"),
            TelemetryEventKind::IrqSampled => f.write_str("irq-sampled"),
            TelemetryEventKind::IrqUnmasked => f.write_str("irq-unmasked"),
            TelemetryEventKind::IrqMasked => f.write_str("irq-masked"),
            TelemetryEventKind::SequenceStarted(kind) => write!(f, "sequence-started {kind}"),
            TelemetryEventKind::SequenceComplete(kind) => write!(f, "sequence-complete {kind}"),
            TelemetryEventKind::DisplayChanged(state) => write!(f, "display {state}"),
            TelemetryEventKind::ProximityChanged => f.write_str("proximity-changed"),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    /// Pin transition with the gap since the previous one.
    Pin {
        elapsed_since_previous: Option<Duration>,
    },
    /// Error behind a fault event.
    Fault(Error),
    /// Line level or proximity state.
    Level(bool),
    /// Summary of a completed sequence.
    Sequence(SequenceTelemetry),
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Pin {
                elapsed_since_previous: Some(elapsed),
            } => write!(f, "+{}us", elapsed.as_micros()),
            TelemetryPayload::Pin {
                elapsed_since_previous: None,
            } => f.write_str("first"),
            TelemetryPayload::Fault(err) => write!(f, "{err}"),
            TelemetryPayload::Level(level) => write!(f, "{}", u8::from(*level)),
            TelemetryPayload::Sequence(summary) => write!(
                f,
                "{}us, {} fault(s)",
                summary.duration.as_micros(),
                summary.faults
            ),
        }
    }
}

/// Sequence completion summary payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceTelemetry {
    pub duration: Duration,
    pub faults: u8,
}

impl SequenceTelemetry {
    #[must_use]
    pub const fn new(duration: Duration, faults: u8) -> Self {
        Self { duration, faults }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: TimestampMicros,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} @{}us {}", self.id, self.timestamp, self.event)?;
        if self.details != TelemetryPayload::None {
            write!(f, " ({})", self.details)?;
        }
        Ok(())
    }
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    last_transition_at: Option<TimestampMicros>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        timestamp: TimestampMicros,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details,
        });

        id
    }

    /// Records a pin profile selection and captures elapsed time since the
    /// previous successful transition.
    pub fn record_profile(
        &mut self,
        profile: PinProfile,
        outcome: Result<(), Error>,
        timestamp: TimestampMicros,
    ) -> EventId {
        match outcome {
            Ok(()) => {
                let elapsed = self
                    .last_transition_at
                    .map(|previous| Duration::from_micros(timestamp.saturating_sub(previous)));
                self.last_transition_at = Some(timestamp);
                self.record(
                    TelemetryEventKind::ProfileSelected(profile),
                    TelemetryPayload::Pin {
                        elapsed_since_previous: elapsed,
                    },
                    timestamp,
                )
            }
            Err(err) => self.record(
                TelemetryEventKind::ProfileFailed(profile),
                TelemetryPayload::Fault(err),
                timestamp,
            ),
        }
    }

    /// Records a rail transition or the fault that prevented it.
    pub fn record_rail(
        &mut self,
        rail: Rail,
        enable: bool,
        outcome: Result<(), Error>,
        timestamp: TimestampMicros,
    ) -> EventId {
        match (enable, outcome) {
            (true, Ok(())) => self.record(
                TelemetryEventKind::RailEnabled(rail),
                TelemetryPayload::None,
                timestamp,
            ),
            (false, Ok(())) => self.record(
                TelemetryEventKind::RailDisabled(rail),
                TelemetryPayload::None,
                timestamp,
            ),
            (_, Err(err)) => self.record(
                TelemetryEventKind::RailFault(rail),
                TelemetryPayload::Fault(err),
                timestamp,
            ),
        }
    }

    /// Records the completion of a sequence run.
    pub fn record_sequence_completion(
        &mut self,
        kind: SequenceKind,
        started_at: TimestampMicros,
        timestamp: TimestampMicros,
        faults: usize,
    ) -> EventId {
        let duration = Duration::from_micros(timestamp.saturating_sub(started_at));
        let faults = u8::try_from(faults).unwrap_or(u8::MAX);
        self.record(
            TelemetryEventKind::SequenceComplete(kind),
            TelemetryPayload::Sequence(SequenceTelemetry::new(duration, faults)),
            timestamp,
        )
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwError;

    const EIO: Error = Error::HardwareOperationFailed(HwError::new(-5));

    #[test]
    fn recorder_tracks_transition_elapsed_time() {
        let mut recorder: TelemetryRecorder<4> = TelemetryRecorder::new();

        recorder.record_profile(PinProfile::ResetActive, Ok(()), 0);
        recorder.record_profile(PinProfile::ResetReset, Ok(()), 100);

        let latest = recorder.latest().unwrap();
        assert_eq!(
            latest.event,
            TelemetryEventKind::ProfileSelected(PinProfile::ResetReset)
        );
        assert_eq!(
            latest.details,
            TelemetryPayload::Pin {
                elapsed_since_previous: Some(Duration::from_micros(100)),
            }
        );
    }

    #[test]
    fn failed_selection_does_not_reset_elapsed_baseline() {
        let mut recorder: TelemetryRecorder<4> = TelemetryRecorder::new();

        recorder.record_profile(PinProfile::ResetActive, Ok(()), 10);
        recorder.record_profile(PinProfile::ResetReset, Err(EIO), 50);
        recorder.record_profile(PinProfile::ResetActive, Ok(()), 80);

        let events: Vec<_> = recorder.oldest_first().map(|record| record.details).collect();
        assert_eq!(events[1], TelemetryPayload::Fault(EIO));
        assert_eq!(
            events[2],
            TelemetryPayload::Pin {
                elapsed_since_previous: Some(Duration::from_micros(70)),
            }
        );
    }

    #[test]
    fn ring_keeps_newest_records_in_order() {
        let mut recorder: TelemetryRecorder<2> = TelemetryRecorder::new();

        for rail in Rail::ALL {
            recorder.record_rail(rail, true, Ok(()), 1);
        }

        let ids: Vec<EventId> = recorder.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn sequence_summary_saturates_fault_count() {
        let mut recorder: TelemetryRecorder<2> = TelemetryRecorder::new();
        recorder.record_sequence_completion(SequenceKind::PowerOn, 10, 250, 300);

        let record = recorder.latest().unwrap();
        assert_eq!(
            record.details,
            TelemetryPayload::Sequence(SequenceTelemetry::new(Duration::from_micros(240), u8::MAX))
        );
    }
}
