//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! [`TeeSink`] fans one event out to two sinks, e.g. the log and the
//! status board.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::engine::DecisionReason;
use crate::engine::modes::CoolingMode;
use crate::engine::rules::Rule;
use crate::safety::Severity;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn reading(v: Option<f32>) -> String {
    v.map_or_else(|| "--".into(), |v| format!("{:.1}", v))
}

/// One human-readable line explaining why the room entered `to`.
pub fn describe_mode_change(to: CoolingMode, reason: &DecisionReason) -> String {
    let trigger = match reason {
        DecisionReason::Rule {
            trigger: Some((zone, value)),
            ..
        } => Some((zone.label(), *value)),
        _ => None,
    };
    let rule = match reason {
        DecisionReason::Rule { rule, .. } => Some(*rule),
        _ => None,
    };
    match (rule, trigger) {
        (Some(Rule::Emergency | Rule::AcRequired), Some((label, v))) => format!(
            "Room in {} Mode: {} of ({:.1}\u{00b0}C) is above tolerance",
            to, label, v
        ),
        (Some(Rule::ColdEscalation), Some((label, v))) => format!(
            "Room in {} Mode: {} of ({:.1}\u{00b0}C) is elevated",
            to, label, v
        ),
        (Some(Rule::ColdBelowMinimum), Some((label, v))) => format!(
            "Room in {} Mode: {} of ({:.1}\u{00b0}C) is below minimum",
            to, label, v
        ),
        (Some(_), Some((label, v))) => format!(
            "Room in {} Mode: {} of ({:.1}\u{00b0}C) is within tolerance",
            to, label, v
        ),
        _ => format!("Room in {} Mode", to),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | mode={} op={} | ambient={} floor={} hot={} cold={}\u{00b0}C | \
                     relays={} | faults=0b{:08b}",
                    t.mode,
                    t.operation_mode,
                    reading(t.readings.ambient),
                    reading(t.readings.floor),
                    reading(t.readings.hot),
                    reading(t.readings.cold),
                    t.actuators.map_or_else(
                        || "unknown".into(),
                        |s| format!(
                            "damper={} fan1={} fan2={} ac={}",
                            if s.damper_open { "open" } else { "closed" },
                            u8::from(s.fan1),
                            u8::from(s.fan2),
                            u8::from(s.ac)
                        )
                    ),
                    t.fault_flags,
                );
            }
            AppEvent::ModeChanged { from, to, reason } => {
                info!("MODE | {} -> {} | {}", from, to, describe_mode_change(*to, reason));
                if *to == CoolingMode::Emergency {
                    error!("MODE | EMERGENCY cooling engaged");
                }
            }
            AppEvent::DwellLocked {
                wanted,
                remaining_secs,
            } => {
                info!("MODE | AC held, {} wanted, {}s of minimum run left", wanted, remaining_secs);
            }
            AppEvent::TelemetryFault {
                zone,
                error: e,
                severity,
            } => match severity {
                Severity::Info => info!("FAULT | {} reading unavailable: {}", zone.label(), e),
                Severity::Warn => warn!("FAULT | {} reading still unavailable: {}", zone.label(), e),
                Severity::Error => error!("FAULT | {} reading unavailable, escalated: {}", zone.label(), e),
            },
            AppEvent::ActuatorFault(e) => {
                error!("FAULT | actuator: {}", e);
            }
            AppEvent::OverrideApplied { operation, mode } => {
                info!(
                    "MODE | override: {} ({})",
                    operation,
                    mode.map_or("engine", CoolingMode::name)
                );
            }
            AppEvent::Started { mode, operation } => {
                info!("START | mode={} op={}", mode, operation);
            }
        }
    }
}

/// Forward every event to two sinks.
pub struct TeeSink<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for TeeSink<A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}
