//! Integration tests for the ControlService → decide → actuator pipeline.
//!
//! Each test drives whole ticks through mock adapters and asserts on the
//! actuator command history and the emitted events.

use super::mock_hw::{MockActuator, MockModes, MockTelemetry, RecordingSink};

use envirozen::app::events::AppEvent;
use envirozen::app::service::{ControlService, TickOutcome};
use envirozen::config::SystemConfig;
use envirozen::engine::DecisionReason;
use envirozen::engine::modes::{CoolingMode, OperationMode};
use envirozen::engine::rules::Rule;
use envirozen::error::TelemetryError;
use envirozen::safety::{Fault, Severity};
use envirozen::thresholds::Zone;

struct Rig {
    svc: ControlService,
    telemetry: MockTelemetry,
    relays: MockActuator,
    modes: MockModes,
    sink: RecordingSink,
}

impl Rig {
    fn new(ambient: f32, hot: f32, cold: f32) -> Self {
        let mut rig = Self {
            svc: ControlService::new(SystemConfig::default()),
            telemetry: MockTelemetry::with(ambient, hot, cold),
            relays: MockActuator::new(),
            modes: MockModes::automatic(),
            sink: RecordingSink::new(),
        };
        rig.svc.start(&rig.modes, &mut rig.sink);
        rig
    }

    fn tick(&mut self, now: u64) -> TickOutcome {
        self.svc.tick(
            &mut self.telemetry,
            &mut self.relays,
            &self.modes,
            &mut self.sink,
            now,
        )
    }
}

// ── Dwell lock ───────────────────────────────────────────────

#[test]
fn ac_is_held_for_minimum_run_time() {
    let mut rig = Rig::new(20.0, 32.0, 15.0);
    assert!(matches!(rig.tick(0), TickOutcome::Applied { mode: CoolingMode::AcOn, .. }));

    rig.telemetry.set(Zone::Hot, 22.0);
    let out = rig.tick(1);
    assert_eq!(
        out,
        TickOutcome::Applied {
            mode: CoolingMode::AcOn,
            reason: DecisionReason::DwellLocked {
                wanted: CoolingMode::FreeCooling,
                remaining_secs: 299,
            },
        }
    );
    assert_eq!(rig.svc.state().ac_engaged_at, Some(0));

    // Still locked one second before the dwell elapses.
    assert_eq!(rig.svc.mode(), CoolingMode::AcOn);
    rig.tick(299);
    assert_eq!(rig.svc.mode(), CoolingMode::AcOn);

    rig.tick(300);
    assert_eq!(rig.svc.mode(), CoolingMode::FreeCooling);
    assert_eq!(rig.svc.state().ac_engaged_at, None);
    assert_eq!(
        rig.sink.mode_changes(),
        [
            (CoolingMode::PassiveCooling, CoolingMode::AcOn),
            (CoolingMode::AcOn, CoolingMode::FreeCooling),
        ]
    );
}

#[test]
fn dwell_lock_is_reported_with_remaining_time() {
    let mut rig = Rig::new(20.0, 32.0, 15.0);
    rig.tick(0);
    rig.telemetry.set(Zone::Hot, 22.0);
    rig.tick(100);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::DwellLocked {
            wanted: CoolingMode::FreeCooling,
            remaining_secs: 200
        }
    )));
    assert_eq!(rig.svc.build_telemetry(None, 100).dwell_remaining_secs, Some(200));
}

#[test]
fn emergency_overrides_dwell_lock() {
    let mut rig = Rig::new(20.0, 32.0, 15.0);
    rig.tick(0);
    rig.telemetry.set(Zone::Hot, 37.0);
    assert!(matches!(
        rig.tick(1),
        TickOutcome::Applied {
            mode: CoolingMode::Emergency,
            reason: DecisionReason::Rule {
                rule: Rule::Emergency,
                ..
            },
        }
    ));
    assert_eq!(rig.relays.last_call(), Some(CoolingMode::Emergency));
    assert!(rig.svc.fault_flags() & Fault::EmergencyBreach.mask() != 0);
}

// ── Ladder outcomes ──────────────────────────────────────────

#[test]
fn cold_below_minimum_goes_passive() {
    let mut rig = Rig::new(18.0, 20.0, 8.0);
    assert_eq!(
        rig.tick(0),
        TickOutcome::Applied {
            mode: CoolingMode::PassiveCooling,
            reason: DecisionReason::Rule {
                rule: Rule::ColdBelowMinimum,
                trigger: Some((Zone::Cold, 8.0)),
            },
        }
    );
    // Already passive at boot: no mode change is announced.
    assert!(rig.sink.mode_changes().is_empty());
}

#[test]
fn elevated_cold_aisle_escalates_to_turbo() {
    let mut rig = Rig::new(20.0, 25.0, 19.0);
    rig.tick(0);
    assert_eq!(rig.svc.mode(), CoolingMode::FreeCoolingTurbo);
    assert_eq!(rig.relays.last_call(), Some(CoolingMode::FreeCoolingTurbo));
}

#[test]
fn missing_floor_reading_does_not_block_decision() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    assert!(matches!(rig.tick(0), TickOutcome::Applied { mode: CoolingMode::FreeCooling, .. }));
    assert!(rig.svc.fault_flags() & Fault::FloorUnavailable.mask() != 0);
}

// ── Telemetry faults ─────────────────────────────────────────

#[test]
fn telemetry_fault_skips_tick_and_leaves_outputs() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    rig.tick(0);
    assert_eq!(rig.relays.calls, [CoolingMode::FreeCooling]);

    rig.telemetry.fail(Zone::Hot, TelemetryError::TransportFailure);
    assert_eq!(rig.tick(10), TickOutcome::TelemetryFault(Zone::Hot));
    assert_eq!(rig.relays.calls, [CoolingMode::FreeCooling], "no actuation on a faulted tick");
    assert_eq!(rig.svc.mode(), CoolingMode::FreeCooling);
}

#[test]
fn repeated_telemetry_fault_escalates_severity() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    rig.telemetry.fail(Zone::Cold, TelemetryError::NoData);
    for now in 0..4 {
        rig.tick(now * 10);
    }
    let severities: Vec<Severity> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::TelemetryFault {
                zone: Zone::Cold,
                severity,
                ..
            } => Some(*severity),
            _ => None,
        })
        .collect();
    assert_eq!(
        severities,
        [Severity::Info, Severity::Warn, Severity::Error, Severity::Error]
    );

    // Recovery clears the bit.
    rig.telemetry.set(Zone::Cold, 15.0);
    rig.tick(40);
    assert!(rig.svc.fault_flags() & Fault::ColdUnavailable.mask() == 0);
}

// ── Actuator faults ──────────────────────────────────────────

#[test]
fn actuator_fault_is_reported_and_retried() {
    let mut rig = Rig::new(20.0, 32.0, 15.0);
    rig.relays.fail_next = true;
    let out = rig.tick(0);
    assert!(matches!(out, TickOutcome::ActuatorFault(_)));
    assert!(rig.svc.fault_flags() & Fault::ActuatorFault.mask() != 0);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ActuatorFault(_))), 1);

    // Next tick re-applies the same mode and clears the fault.
    assert!(matches!(rig.tick(10), TickOutcome::Applied { mode: CoolingMode::AcOn, .. }));
    assert_eq!(rig.relays.calls, [CoolingMode::AcOn, CoolingMode::AcOn]);
    assert!(rig.svc.fault_flags() & Fault::ActuatorFault.mask() == 0);
}

// ── Manual override ──────────────────────────────────────────

#[test]
fn manual_override_freezes_automatic_decisions() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    rig.tick(0);
    let before = rig.relays.calls.len();
    let fetches = rig.telemetry.fetches;

    rig.modes.set(OperationMode::Manual, Some(CoolingMode::PassiveCooling));
    rig.telemetry.set(Zone::Hot, 40.0);
    for now in 1..5 {
        assert_eq!(rig.tick(now * 10), TickOutcome::Overridden(OperationMode::Manual));
    }
    assert_eq!(rig.relays.calls.len(), before, "service must not drive relays in manual");
    assert_eq!(rig.telemetry.fetches, fetches, "no telemetry reads in manual");
    assert_eq!(rig.svc.mode(), CoolingMode::PassiveCooling);
}

#[test]
fn resuming_after_forced_ac_respects_dwell() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    rig.modes.set(OperationMode::Manual, Some(CoolingMode::AcOn));
    rig.tick(0);
    assert_eq!(rig.svc.state().ac_engaged_at, Some(0));

    rig.modes.set(OperationMode::Automatic, None);
    assert!(matches!(
        rig.tick(60),
        TickOutcome::Applied {
            mode: CoolingMode::AcOn,
            reason: DecisionReason::DwellLocked { .. },
        }
    ));
    rig.tick(300);
    assert_eq!(rig.svc.mode(), CoolingMode::FreeCooling);
}

// ── Telemetry snapshots ──────────────────────────────────────

#[test]
fn every_tick_emits_one_snapshot() {
    let mut rig = Rig::new(20.0, 25.0, 15.0);
    rig.sink.clear();
    rig.tick(0);
    rig.telemetry.fail(Zone::Ambient, TelemetryError::BackendError);
    rig.tick(10);
    rig.modes.set(OperationMode::Emergency, Some(CoolingMode::Emergency));
    rig.tick(20);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 3);
    assert_eq!(rig.svc.tick_count(), 3);

    let last = rig
        .sink
        .events
        .iter()
        .rev()
        .find_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last.operation_mode, OperationMode::Emergency);
    assert_eq!(last.mode, CoolingMode::Emergency);
    assert_eq!(last.uptime_secs, 20);
}
