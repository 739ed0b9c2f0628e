//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the controller state and the fault supervisor.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  TelemetrySource ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                      │     ControlService       │
//!  OperationModeSource▶│ decide · FaultSupervisor │
//!                      └────────────┬────────────┘
//!                                   ▼
//!                              ActuatorPort
//! ```

use log::{debug, info};

use crate::config::SystemConfig;
use crate::engine::modes::{ActuatorSignals, CoolingMode, OperationMode};
use crate::engine::{ControllerState, Decision, DecisionReason, decide};
use crate::error::ActuatorError;
use crate::safety::FaultSupervisor;
use crate::telemetry::read_zones;
use crate::thresholds::{Zone, ZoneReadings};

use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, EventSink, OperationModeSource, TelemetrySource};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// An operator holds the outputs; nothing was read or applied.
    Overridden(OperationMode),
    /// A decision-relevant zone was unavailable; outputs left as they were.
    TelemetryFault(Zone),
    /// The engine decided and the mode was applied.
    Applied {
        mode: CoolingMode,
        reason: DecisionReason,
    },
    /// The engine decided but the relays could not be driven.
    ActuatorFault(ActuatorError),
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService {
    config: SystemConfig,
    state: ControllerState,
    supervisor: FaultSupervisor,
    tick_count: u64,
    last_readings: ZoneReadings,
    dwell_remaining: Option<u64>,
}

impl ControlService {
    /// Construct the service from a validated configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            state: ControllerState::initial(),
            supervisor: FaultSupervisor::new(),
            tick_count: 0,
            last_readings: ZoneReadings::default(),
            dwell_remaining: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce startup.  Does not touch the actuators: the first tick
    /// decides what to apply.
    pub fn start(&mut self, modes: &impl OperationModeSource, sink: &mut impl EventSink) {
        self.state.operation_mode = modes.current();
        sink.emit(&AppEvent::Started {
            mode: self.state.current_mode,
            operation: self.state.operation_mode,
        });
        info!(
            "ControlService started in {} ({})",
            self.state.current_mode, self.state.operation_mode
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: flag → telemetry → decide → actuators.
    pub fn tick(
        &mut self,
        telemetry: &mut impl TelemetrySource,
        actuator: &mut impl ActuatorPort,
        modes: &impl OperationModeSource,
        sink: &mut impl EventSink,
        now: u64,
    ) -> TickOutcome {
        self.tick_count += 1;

        // 1. Operation mode
        if let Some(applied) = modes.take_applied_override() {
            // The operator drove the outputs since the last tick; start
            // the AC dwell clock from here even if /auto already followed.
            self.state = self.state.transition(applied, now);
        }
        let operation = modes.current();
        if operation != OperationMode::Automatic {
            return self.overridden(operation, modes, &*actuator, sink, now);
        }
        self.state.operation_mode = operation;

        // 2. Zone sweep via TelemetrySource
        let sweep = read_zones(telemetry, &self.config.zones);
        for (zone, severity) in self.supervisor.record_sweep(&sweep) {
            if let Some(error) = sweep.fault_for(zone) {
                sink.emit(&AppEvent::TelemetryFault {
                    zone,
                    error,
                    severity,
                });
            }
        }
        self.last_readings = sweep.readings;
        self.supervisor
            .record_readings(&sweep.readings, &self.config.zones);

        // 3. Decision (pure)
        let previous = self.state;
        let decision = decide(
            &sweep.readings,
            &self.config.zones,
            previous,
            now,
            u64::from(self.config.min_ac_run_time_secs),
        );

        if let DecisionReason::TelemetryUnavailable(zone) = decision.reason {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(actuator.signals(), now)));
            return TickOutcome::TelemetryFault(zone);
        }

        // 4. Apply via ActuatorPort, unless an override landed during the
        //    sweep.  The flag is re-read under the actuator lock.
        let mut still_automatic = || modes.current() == OperationMode::Automatic;
        let outcome = match actuator.apply_guarded(decision.mode, &mut still_automatic) {
            Ok(true) => {
                self.supervisor.record_actuator(&Ok(()));
                self.commit(decision, previous, sink);
                TickOutcome::Applied {
                    mode: decision.mode,
                    reason: decision.reason,
                }
            }
            Ok(false) => {
                debug!(
                    "tick {}: override arrived mid-sweep, {} dropped",
                    self.tick_count, decision.mode
                );
                return self.overridden(modes.current(), modes, &*actuator, sink, now);
            }
            // The outputs never reached the decided mode; keep the old state
            // so no dwell clock starts for a compressor that is off.
            Err(e) => {
                self.supervisor.record_actuator(&Err(e));
                self.dwell_remaining = None;
                sink.emit(&AppEvent::ActuatorFault(e));
                TickOutcome::ActuatorFault(e)
            }
        };

        // 5. Snapshot
        sink.emit(&AppEvent::Telemetry(self.build_telemetry(actuator.signals(), now)));
        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry(&self, actuators: Option<ActuatorSignals>, now: u64) -> TelemetryData {
        TelemetryData {
            uptime_secs: now,
            mode: self.state.current_mode,
            operation_mode: self.state.operation_mode,
            readings: self.last_readings,
            actuators,
            fault_flags: self.supervisor.faults(),
            dwell_remaining_secs: self.dwell_remaining,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn mode(&self) -> CoolingMode {
        self.state.current_mode
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Current active fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.supervisor.faults()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// An operator holds the outputs: mirror the forced mode so the AC
    /// dwell clock is right when automatic control resumes.
    fn overridden(
        &mut self,
        operation: OperationMode,
        modes: &impl OperationModeSource,
        actuator: &impl ActuatorPort,
        sink: &mut impl EventSink,
        now: u64,
    ) -> TickOutcome {
        self.state.operation_mode = operation;
        if let Some(forced) = modes.forced_mode() {
            self.state = self.state.transition(forced, now);
        }
        self.dwell_remaining = None;
        debug!("tick {}: overridden ({})", self.tick_count, operation);
        sink.emit(&AppEvent::Telemetry(self.build_telemetry(actuator.signals(), now)));
        TickOutcome::Overridden(operation)
    }

    fn commit(&mut self, decision: Decision, previous: ControllerState, sink: &mut impl EventSink) {
        self.dwell_remaining = match decision.reason {
            DecisionReason::DwellLocked {
                wanted,
                remaining_secs,
            } => {
                sink.emit(&AppEvent::DwellLocked {
                    wanted,
                    remaining_secs,
                });
                Some(remaining_secs)
            }
            _ => None,
        };
        if decision.changes_mode(&previous) {
            sink.emit(&AppEvent::ModeChanged {
                from: previous.current_mode,
                to: decision.mode,
                reason: decision.reason,
            });
        }
        self.state = decision.state;
    }
}
