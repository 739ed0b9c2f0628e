//! Outbound application events and the shared status board.
//!
//! The [`ControlService`](super::service::ControlService) emits events
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, or publish
//! to the [`StatusBoard`] that backs `GET /status`.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::engine::DecisionReason;
use crate::engine::modes::{ActuatorSignals, CoolingMode, OperationMode};
use crate::error::{ActuatorError, TelemetryError};
use crate::safety::Severity;
use crate::thresholds::{ThresholdTable, Zone, ZoneReadings};

use super::ports::EventSink;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot (once per evaluated tick).
    Telemetry(TelemetryData),

    /// The engine moved the outputs to a new mode.
    ModeChanged {
        from: CoolingMode,
        to: CoolingMode,
        reason: DecisionReason,
    },

    /// The engine wanted to leave AC mode but the dwell lock held it.
    DwellLocked {
        wanted: CoolingMode,
        remaining_secs: u64,
    },

    /// A zone could not be read this tick.
    TelemetryFault {
        zone: Zone,
        error: TelemetryError,
        severity: Severity,
    },

    /// Applying a mode to the relays failed.
    ActuatorFault(ActuatorError),

    /// An operator changed the operation mode.
    OverrideApplied {
        operation: OperationMode,
        mode: Option<CoolingMode>,
    },

    /// The service has started (carries initial mode and operation mode).
    Started {
        mode: CoolingMode,
        operation: OperationMode,
    },
}

/// A point-in-time snapshot suitable for logging or the status page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub uptime_secs: u64,
    pub mode: CoolingMode,
    pub operation_mode: OperationMode,
    pub readings: ZoneReadings,
    /// `None` until the relays have been driven successfully.
    pub actuators: Option<ActuatorSignals>,
    pub fault_flags: u8,
    /// Seconds before AC mode may be left, while locked.
    pub dwell_remaining_secs: Option<u64>,
}

// ── Status board ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct StatusDocument {
    telemetry: Option<TelemetryData>,
    thresholds: ThresholdTable,
}

/// Latest telemetry plus thresholds, shared between the control loop
/// (writer) and the override server (reader).
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Mutex<StatusDocument>>,
}

impl StatusBoard {
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusDocument {
                telemetry: None,
                thresholds,
            })),
        }
    }

    pub fn publish(&self, telemetry: TelemetryData) {
        if let Ok(mut doc) = self.inner.lock() {
            doc.telemetry = Some(telemetry);
        }
    }

    pub fn latest(&self) -> Option<TelemetryData> {
        self.inner.lock().ok().and_then(|d| d.telemetry.clone())
    }

    /// Status JSON.  `None` only if a writer panicked mid-update.
    pub fn to_json(&self) -> Option<String> {
        let doc = self.inner.lock().ok()?;
        serde_json::to_string(&*doc).ok()
    }
}

impl EventSink for StatusBoard {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::Telemetry(t) = event {
            self.publish(t.clone());
        }
    }
}
