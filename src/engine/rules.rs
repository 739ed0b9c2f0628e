//! The priority ladder as a table of plain `fn` pointers.
//!
//! ```text
//!  hot >= hot.emergency ─────────────────────────────▶ Emergency
//!  hot|ambient|cold >= warning ──────────────────────▶ AcOn
//!  cold >= cold.elevated ────────────────────────────▶ FreeCoolingTurbo
//!  cold <  cold.minimum ─────────────────────────────▶ PassiveCooling
//!  cold.minimum <= cold < cold.warning ──────────────▶ FreeCooling
//!  (nothing matched, NaN readings) ──────────────────▶ PassiveCooling
//! ```
//!
//! Rules are evaluated top to bottom; the first `Some` wins.  Every
//! comparison is written so that a NaN reading makes the rule decline
//! instead of firing.

use core::fmt;

use crate::thresholds::{ThresholdTable, Zone};

use super::modes::CoolingMode;

// ---------------------------------------------------------------------------
// Rule identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Rule {
    Emergency = 0,
    AcRequired = 1,
    ColdEscalation = 2,
    ColdBelowMinimum = 3,
    Nominal = 4,
    Fallback = 5,
}

impl Rule {
    /// Rules held in the ladder table (everything but `Fallback`).
    pub const LADDER_LEN: usize = 5;

    pub fn name(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::AcRequired => "ac-required",
            Self::ColdEscalation => "cold-escalation",
            Self::ColdBelowMinimum => "cold-below-minimum",
            Self::Nominal => "nominal",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Rule evaluation
// ---------------------------------------------------------------------------

/// Decision-relevant readings for one tick.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub ambient: f32,
    pub hot: f32,
    pub cold: f32,
    pub table: &'a ThresholdTable,
}

/// A fired rule: the mode it selects and the zone reading that tripped it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleHit {
    pub mode: CoolingMode,
    pub trigger: Option<(Zone, f32)>,
}

/// Signature for a ladder rung.  Returns `Some` to claim the tick.
pub type RuleFn = fn(&RuleInput<'_>) -> Option<RuleHit>;

pub struct RuleDescriptor {
    pub rule: Rule,
    pub eval: RuleFn,
}

/// Build the ladder in priority order.
pub fn build_rule_ladder() -> [RuleDescriptor; Rule::LADDER_LEN] {
    [
        RuleDescriptor {
            rule: Rule::Emergency,
            eval: emergency,
        },
        RuleDescriptor {
            rule: Rule::AcRequired,
            eval: ac_required,
        },
        RuleDescriptor {
            rule: Rule::ColdEscalation,
            eval: cold_escalation,
        },
        RuleDescriptor {
            rule: Rule::ColdBelowMinimum,
            eval: cold_below_minimum,
        },
        RuleDescriptor {
            rule: Rule::Nominal,
            eval: nominal,
        },
    ]
}

/// Walk `ladder` and return the first rule that fires.
pub fn evaluate(ladder: &[RuleDescriptor], input: &RuleInput<'_>) -> (Rule, RuleHit) {
    ladder
        .iter()
        .find_map(|rung| (rung.eval)(input).map(|hit| (rung.rule, hit)))
        .unwrap_or((
            Rule::Fallback,
            RuleHit {
                mode: CoolingMode::PassiveCooling,
                trigger: None,
            },
        ))
}

fn hit(mode: CoolingMode, zone: Zone, value: f32) -> Option<RuleHit> {
    Some(RuleHit {
        mode,
        trigger: Some((zone, value)),
    })
}

fn emergency(i: &RuleInput<'_>) -> Option<RuleHit> {
    let limit = i.table.hot.thresholds.emergency?;
    (i.hot >= limit).then_some(())?;
    hit(CoolingMode::Emergency, Zone::Hot, i.hot)
}

fn ac_required(i: &RuleInput<'_>) -> Option<RuleHit> {
    let t = i.table;
    [
        (Zone::Hot, i.hot, t.hot.thresholds.warning),
        (Zone::Ambient, i.ambient, t.ambient.thresholds.warning),
        (Zone::Cold, i.cold, t.cold.thresholds.warning),
    ]
    .into_iter()
    .find(|(_, value, warning)| value >= warning)
    .and_then(|(zone, value, _)| hit(CoolingMode::AcOn, zone, value))
}

fn cold_escalation(i: &RuleInput<'_>) -> Option<RuleHit> {
    let elevated = i.table.cold.thresholds.elevated_or_default();
    (i.cold >= elevated).then_some(())?;
    hit(CoolingMode::FreeCoolingTurbo, Zone::Cold, i.cold)
}

fn cold_below_minimum(i: &RuleInput<'_>) -> Option<RuleHit> {
    let minimum = i.table.cold.thresholds.minimum?;
    (i.cold < minimum).then_some(())?;
    hit(CoolingMode::PassiveCooling, Zone::Cold, i.cold)
}

fn nominal(i: &RuleInput<'_>) -> Option<RuleHit> {
    let cold = &i.table.cold.thresholds;
    let above_min = cold.minimum.is_none_or(|min| i.cold >= min);
    (above_min && i.cold < cold.warning).then_some(())?;
    hit(CoolingMode::FreeCooling, Zone::Cold, i.cold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ambient: f32, hot: f32, cold: f32) -> (Rule, RuleHit) {
        let table = ThresholdTable::default();
        let input = RuleInput {
            ambient,
            hot,
            cold,
            table: &table,
        };
        evaluate(&build_rule_ladder(), &input)
    }

    #[test]
    fn ladder_is_in_priority_order() {
        let order: Vec<Rule> = build_rule_ladder().iter().map(|r| r.rule).collect();
        assert_eq!(
            order,
            [
                Rule::Emergency,
                Rule::AcRequired,
                Rule::ColdEscalation,
                Rule::ColdBelowMinimum,
                Rule::Nominal,
            ]
        );
    }

    #[test]
    fn emergency_beats_ac() {
        let (rule, hit) = run(30.0, 37.0, 25.0);
        assert_eq!(rule, Rule::Emergency);
        assert_eq!(hit.mode, CoolingMode::Emergency);
        assert_eq!(hit.trigger, Some((Zone::Hot, 37.0)));
    }

    #[test]
    fn emergency_threshold_is_inclusive() {
        assert_eq!(run(20.0, 36.0, 15.0).0, Rule::Emergency);
    }

    #[test]
    fn ac_trigger_names_first_hot_zone() {
        let (rule, hit) = run(26.0, 25.0, 15.0);
        assert_eq!(rule, Rule::AcRequired);
        assert_eq!(hit.trigger, Some((Zone::Ambient, 26.0)));

        let (_, hit) = run(20.0, 32.0, 21.0);
        assert_eq!(hit.trigger, Some((Zone::Hot, 32.0)));
    }

    #[test]
    fn cold_at_warning_requires_ac() {
        let (rule, hit) = run(20.0, 25.0, 20.0);
        assert_eq!(rule, Rule::AcRequired);
        assert_eq!(hit.trigger, Some((Zone::Cold, 20.0)));
    }

    #[test]
    fn cold_elevated_band_is_turbo() {
        let (rule, hit) = run(20.0, 25.0, 18.5);
        assert_eq!(rule, Rule::ColdEscalation);
        assert_eq!(hit.mode, CoolingMode::FreeCoolingTurbo);
    }

    #[test]
    fn cold_below_minimum_is_passive() {
        let (rule, hit) = run(18.0, 20.0, 8.0);
        assert_eq!(rule, Rule::ColdBelowMinimum);
        assert_eq!(hit.mode, CoolingMode::PassiveCooling);
    }

    #[test]
    fn nominal_band_is_free_cooling() {
        let (rule, hit) = run(20.0, 25.0, 15.0);
        assert_eq!(rule, Rule::Nominal);
        assert_eq!(hit.mode, CoolingMode::FreeCooling);

        // Minimum is inclusive.
        assert_eq!(run(20.0, 25.0, 10.0).0, Rule::Nominal);
    }

    #[test]
    fn nan_cold_falls_back_to_passive() {
        let (rule, hit) = run(20.0, 25.0, f32::NAN);
        assert_eq!(rule, Rule::Fallback);
        assert_eq!(hit.mode, CoolingMode::PassiveCooling);
        assert_eq!(hit.trigger, None);
    }

    #[test]
    fn nan_hot_does_not_trip_emergency() {
        assert_eq!(run(20.0, f32::NAN, 15.0).0, Rule::Nominal);
    }

    #[test]
    fn infinite_hot_is_emergency() {
        assert_eq!(run(20.0, f32::INFINITY, 15.0).0, Rule::Emergency);
    }
}
