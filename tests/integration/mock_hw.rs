//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO, and serves zone readings from a
//! table the test mutates between ticks.

use std::cell::Cell;
use std::collections::HashMap;

use envirozen::app::events::AppEvent;
use envirozen::app::ports::{ActuatorPort, EventSink, OperationModeSource, TelemetrySource};
use envirozen::engine::modes::{ActuatorSignals, CoolingMode, OperationMode};
use envirozen::error::{ActuatorError, TelemetryError};
use envirozen::thresholds::{ThresholdTable, Zone};

// ── MockTelemetry ─────────────────────────────────────────────

/// Answers each zone's default query from a per-zone table.  Zones
/// without an entry report `NoData`.
pub struct MockTelemetry {
    queries: HashMap<String, Zone>,
    values: HashMap<Zone, Result<f32, TelemetryError>>,
    pub fetches: usize,
}

#[allow(dead_code)]
impl MockTelemetry {
    pub fn new() -> Self {
        let table = ThresholdTable::default();
        let queries = Zone::ALL
            .into_iter()
            .map(|z| (table.get(z).query.clone(), z))
            .collect();
        Self {
            queries,
            values: HashMap::new(),
            fetches: 0,
        }
    }

    /// Convenience for the three decision-relevant zones.
    pub fn with(ambient: f32, hot: f32, cold: f32) -> Self {
        let mut t = Self::new();
        t.set(Zone::Ambient, ambient);
        t.set(Zone::Hot, hot);
        t.set(Zone::Cold, cold);
        t
    }

    pub fn set(&mut self, zone: Zone, value: f32) {
        self.values.insert(zone, Ok(value));
    }

    pub fn fail(&mut self, zone: Zone, error: TelemetryError) {
        self.values.insert(zone, Err(error));
    }
}

impl TelemetrySource for MockTelemetry {
    fn fetch(&mut self, query: &str) -> Result<f32, TelemetryError> {
        self.fetches += 1;
        let zone = self.queries.get(query).ok_or(TelemetryError::QueryInvalid)?;
        self.values
            .get(zone)
            .copied()
            .unwrap_or(Err(TelemetryError::NoData))
    }
}

// ── MockActuator ──────────────────────────────────────────────

pub struct MockActuator {
    pub calls: Vec<CoolingMode>,
    pub fail_next: bool,
    applied: Option<ActuatorSignals>,
}

#[allow(dead_code)]
impl MockActuator {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_next: false,
            applied: None,
        }
    }

    pub fn last_call(&self) -> Option<CoolingMode> {
        self.calls.last().copied()
    }
}

impl ActuatorPort for MockActuator {
    fn apply(&mut self, mode: CoolingMode) -> Result<(), ActuatorError> {
        self.calls.push(mode);
        if std::mem::take(&mut self.fail_next) {
            self.applied = None;
            return Err(ActuatorError::LockPoisoned);
        }
        self.applied = Some(mode.signals());
        Ok(())
    }

    fn signals(&self) -> Option<ActuatorSignals> {
        self.applied
    }
}

// ── MockModes ─────────────────────────────────────────────────

pub struct MockModes {
    operation: Cell<OperationMode>,
    forced: Cell<Option<CoolingMode>>,
}

#[allow(dead_code)]
impl MockModes {
    pub fn automatic() -> Self {
        Self {
            operation: Cell::new(OperationMode::Automatic),
            forced: Cell::new(None),
        }
    }

    pub fn set(&self, operation: OperationMode, forced: Option<CoolingMode>) {
        self.operation.set(operation);
        self.forced.set(forced);
    }
}

impl OperationModeSource for MockModes {
    fn current(&self) -> OperationMode {
        self.operation.get()
    }

    fn forced_mode(&self) -> Option<CoolingMode> {
        self.forced.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn mode_changes(&self) -> Vec<(CoolingMode, CoolingMode)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::ModeChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
