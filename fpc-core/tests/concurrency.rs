mod support;

use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use fpc_core::error::HwError;
use fpc_core::gate::DisplayState;
use fpc_core::pins::PinProfile;
use fpc_core::rails::Rail;
use fpc_core::sequences::SequenceKind;
use fpc_core::telemetry::TelemetryEventKind;
use fpc_core::wake::{WAKE_HOLD_MICROS, WakeNotifier, WakeSource};

use support::{Harness, HwEvent};

#[test]
fn sequences_never_interleave() {
    let harness = Harness::new();
    let controller = harness.controller();

    block_on(join(controller.prepare(true), controller.pulse_reset()));

    assert_eq!(
        harness.events(),
        [
            HwEvent::Select(PinProfile::ResetReset),
            HwEvent::Enable(Rail::SpiSupply),
            HwEvent::Enable(Rail::IoSupply),
            HwEvent::Enable(Rail::AnalogSupply),
            HwEvent::Sleep(100),
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::IrqRead,
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::Sleep(100),
            HwEvent::Select(PinProfile::ResetReset),
            HwEvent::Sleep(5_000),
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::Sleep(5_000),
            HwEvent::IrqRead,
        ]
    );
}

#[test]
fn gate_updates_wait_for_a_running_pulse() {
    let harness = Harness::new();
    let controller = harness.controller();

    block_on(join(controller.pulse_reset(), async {
        controller.set_proximity(true).await;
        controller
            .on_display_state_changed(DisplayState::PoweredDown)
            .await;
    }));

    let events = harness.events();
    assert_eq!(events.last(), Some(&HwEvent::IrqMask));
    assert_eq!(harness.count(HwEvent::IrqMask), 1);
    assert_eq!(events[events.len() - 2], HwEvent::IrqRead);
}

#[test]
fn dropped_prepare_finishes_on_next_call() {
    let harness = Harness::new();
    let controller = harness.controller();

    // The second branch wins at the settle delay and the prepare future is dropped.
    let outcome = block_on(select(controller.prepare(true), async {}));
    assert!(matches!(outcome, Either::Second(())));
    assert_eq!(
        harness.events(),
        [
            HwEvent::Select(PinProfile::ResetReset),
            HwEvent::Enable(Rail::SpiSupply),
            HwEvent::Enable(Rail::IoSupply),
            HwEvent::Enable(Rail::AnalogSupply),
            HwEvent::Sleep(100),
        ]
    );

    assert!(block_on(controller.is_prepared()));
    assert_eq!(
        harness.events(),
        [
            HwEvent::Select(PinProfile::ResetReset),
            HwEvent::Enable(Rail::SpiSupply),
            HwEvent::Enable(Rail::IoSupply),
            HwEvent::Enable(Rail::AnalogSupply),
            HwEvent::Sleep(100),
            HwEvent::Sleep(100),
            HwEvent::Select(PinProfile::ResetActive),
        ]
    );

    harness.clear();
    block_on(controller.prepare(true));
    assert!(harness.events().is_empty());

    let completions = block_on(controller.with_telemetry(|telemetry| {
        telemetry
            .oldest_first()
            .filter(|record| {
                record.event == TelemetryEventKind::SequenceComplete(SequenceKind::PowerOn)
            })
            .count()
    }));
    assert_eq!(completions, 1);
}

#[test]
fn dropped_unprepare_leaves_rails_down() {
    let harness = Harness::new();
    let controller = harness.controller();
    block_on(controller.prepare(true));
    harness.clear();

    let outcome = block_on(select(controller.prepare(false), async {}));
    assert!(matches!(outcome, Either::Second(())));
    assert_eq!(harness.rails_on().len(), 3);

    block_on(controller.prepare(false));

    assert!(harness.rails_on().is_empty());
    assert!(!block_on(controller.is_prepared()));
    assert_eq!(harness.count(HwEvent::Disable(Rail::SpiSupply)), 1);
}

#[test]
fn dropped_reset_pulse_releases_reset_line() {
    let harness = Harness::new();
    let controller = harness.controller();

    let outcome = block_on(select(controller.pulse_reset(), async {}));
    assert!(matches!(outcome, Either::Second(())));

    block_on(controller.on_display_state_changed(DisplayState::PoweredDown));

    assert_eq!(
        harness.events(),
        [
            HwEvent::IrqRead,
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::Sleep(100),
            HwEvent::Sleep(100),
            HwEvent::Select(PinProfile::ResetReset),
            HwEvent::Sleep(5_000),
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::Sleep(5_000),
            HwEvent::IrqRead,
        ]
    );
}

#[test]
fn interrupts_are_handled_while_a_sequence_holds_the_lock() {
    let harness = Harness::new();
    let controller = harness.controller();
    controller.arm_wake(true);

    let ((), event) = block_on(join(controller.pulse_reset(), async {
        controller.on_interrupt()
    }));

    assert!(event.wake_held);
    assert_eq!(event.at, 100);
    assert_eq!(
        harness.events()[..5],
        [
            HwEvent::IrqRead,
            HwEvent::Select(PinProfile::ResetActive),
            HwEvent::Sleep(100),
            HwEvent::StayAwake,
            HwEvent::Select(PinProfile::ResetReset),
        ]
    );
    assert!(controller.notifier().is_holding(harness.now()));
}

#[test]
fn waiter_receives_the_interrupt() {
    let harness = Harness::new();
    let controller = harness.controller();

    let (received, fired) = block_on(join(controller.wait_irq(), async {
        controller.on_interrupt()
    }));

    assert_eq!(received, fired);
    assert_eq!(received.sequence, 1);
    assert!(!received.wake_held);
    assert!(!harness.events().contains(&HwEvent::StayAwake));
}

#[derive(Default)]
struct CountingWake {
    holds: AtomicU32,
}

impl WakeSource for CountingWake {
    fn stay_awake(&self, _hold: Duration) -> Result<(), HwError> {
        self.holds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[test]
fn interrupts_from_many_threads_are_all_counted() {
    let notifier: Arc<WakeNotifier<CriticalSectionRawMutex, CountingWake>> =
        Arc::new(WakeNotifier::new(CountingWake::default()));
    notifier.arm(true);

    let handles: Vec<_> = (0..4_u64)
        .map(|worker| {
            let notifier = Arc::clone(&notifier);
            thread::spawn(move || {
                for tick in 0..100 {
                    notifier.on_interrupt(worker * 1_000 + tick);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finished");
    }

    assert_eq!(notifier.interrupt_count(), 400);
    assert_eq!(notifier.source().holds.load(Ordering::Relaxed), 400);
    assert_eq!(notifier.hold_deadline(), 3_099 + WAKE_HOLD_MICROS);

    let pending = notifier.try_take().expect("event pending");
    assert!((1..=400).contains(&pending.sequence));
    assert_eq!(notifier.try_take(), None);
}

#[test]
fn waiter_on_another_thread_is_woken() {
    let notifier: Arc<WakeNotifier<CriticalSectionRawMutex, CountingWake>> =
        Arc::new(WakeNotifier::new(CountingWake::default()));

    let firing = Arc::clone(&notifier);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        firing.on_interrupt(7)
    });

    let received = block_on(notifier.wait());
    let fired = handle.join().expect("interrupt fired");
    assert_eq!(received, fired);
    assert_eq!(notifier.source().holds.load(Ordering::Relaxed), 0);
}
