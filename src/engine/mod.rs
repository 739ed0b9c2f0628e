//! Mode decision engine.
//!
//! A pure function of (readings, thresholds, previous state, time):
//!
//! ```text
//!              ┌─────────────── guards ───────────────┐
//!  state ────▶ │ operation_mode != Automatic → hold   │
//!  readings ─▶ │ ambient/hot/cold missing    → hold   │
//!              └──────────────────┬───────────────────┘
//!                                 ▼
//!                       priority ladder (rules.rs)
//!                                 │ wanted
//!                                 ▼
//!              ┌──────────── dwell lock ──────────────┐
//!              │ AcOn held for min_ac_run_time unless │
//!              │ wanted == Emergency                  │
//!              └──────────────────┬───────────────────┘
//!                                 ▼
//!                      Decision { mode, state, reason }
//! ```
//!
//! The engine never performs I/O, never panics on out-of-range numbers,
//! and never mutates its inputs: the caller replaces its state with the
//! one returned.

pub mod modes;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::thresholds::{ThresholdTable, Zone, ZoneReadings};

use modes::{CoolingMode, OperationMode};
use rules::{Rule, RuleInput, build_rule_ladder};

/// Default minimum compressor run time once AC mode is entered.
pub const DEFAULT_MIN_AC_RUN_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Controller state
// ---------------------------------------------------------------------------

/// The only mutable decision entity.  Owned by the control loop and
/// threaded through [`decide`] by value.
///
/// Invariant: `ac_engaged_at.is_some()` iff `current_mode == AcOn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub current_mode: CoolingMode,
    /// Monotonic seconds at which AC mode was entered.
    pub ac_engaged_at: Option<u64>,
    pub operation_mode: OperationMode,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::initial()
    }
}

impl ControllerState {
    /// State at process start.
    pub const fn initial() -> Self {
        Self {
            current_mode: CoolingMode::PassiveCooling,
            ac_engaged_at: None,
            operation_mode: OperationMode::Automatic,
        }
    }

    /// Move to `mode`, maintaining the AC timestamp invariant.
    ///
    /// Entering AcOn stamps `now`; staying keeps the original stamp;
    /// leaving clears it.
    pub fn transition(self, mode: CoolingMode, now: u64) -> Self {
        let ac_engaged_at = match mode {
            CoolingMode::AcOn if self.current_mode == CoolingMode::AcOn => {
                self.ac_engaged_at.or(Some(now))
            }
            CoolingMode::AcOn => Some(now),
            _ => None,
        };
        Self {
            current_mode: mode,
            ac_engaged_at,
            ..self
        }
    }

    /// Seconds left before AC mode may be exited, or `None` when unlocked.
    pub fn dwell_remaining(&self, now: u64, min_ac_run_secs: u64) -> Option<u64> {
        if self.current_mode != CoolingMode::AcOn {
            return None;
        }
        let elapsed = now.saturating_sub(self.ac_engaged_at?);
        (elapsed < min_ac_run_secs).then(|| min_ac_run_secs - elapsed)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionReason {
    /// An operator holds the outputs; nothing is evaluated.
    Overridden(OperationMode),
    /// A decision-relevant zone had no reading this tick.
    TelemetryUnavailable(Zone),
    /// A ladder rule fired and its mode was adopted.
    Rule {
        rule: Rule,
        trigger: Option<(Zone, f32)>,
    },
    /// The ladder wanted to leave AC mode but the dwell lock holds it.
    DwellLocked {
        wanted: CoolingMode,
        remaining_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub mode: CoolingMode,
    pub state: ControllerState,
    pub reason: DecisionReason,
}

impl Decision {
    fn hold(state: ControllerState, reason: DecisionReason) -> Self {
        Self {
            mode: state.current_mode,
            state,
            reason,
        }
    }

    /// Whether the decision moves the outputs away from the previous mode.
    pub fn changes_mode(&self, previous: &ControllerState) -> bool {
        self.mode != previous.current_mode
    }
}

/// Choose the cooling mode for this tick.
///
/// `now` is monotonic seconds; `min_ac_run_secs` is the compressor dwell.
pub fn decide(
    readings: &ZoneReadings,
    table: &ThresholdTable,
    state: ControllerState,
    now: u64,
    min_ac_run_secs: u64,
) -> Decision {
    if state.operation_mode != OperationMode::Automatic {
        return Decision::hold(state, DecisionReason::Overridden(state.operation_mode));
    }

    let (Some(ambient), Some(hot), Some(cold)) = (readings.ambient, readings.hot, readings.cold)
    else {
        let zone = readings.first_missing().unwrap_or(Zone::Ambient);
        return Decision::hold(state, DecisionReason::TelemetryUnavailable(zone));
    };

    let input = RuleInput {
        ambient,
        hot,
        cold,
        table,
    };
    let (rule, hit) = rules::evaluate(&build_rule_ladder(), &input);

    if hit.mode != CoolingMode::AcOn && hit.mode != CoolingMode::Emergency {
        if let Some(remaining_secs) = state.dwell_remaining(now, min_ac_run_secs) {
            return Decision::hold(
                state,
                DecisionReason::DwellLocked {
                    wanted: hit.mode,
                    remaining_secs,
                },
            );
        }
    }

    Decision {
        mode: hit.mode,
        state: state.transition(hit.mode, now),
        reason: DecisionReason::Rule {
            rule,
            trigger: hit.trigger,
        },
    }
}
