//! Fault supervisor.
//!
//! Runs **every tick after the zone sweep** and accumulates a latched
//! fault bitmask.  Telemetry and actuator faults never stop the loop;
//! the supervisor's job is to make sure they are reported at the right
//! severity and that recovery is announced.
//!
//! ## Fault lifecycle
//!
//! 1. A zone read fails: its bit is set and its streak starts at 1
//!    (reported as [`Severity::Info`]).
//! 2. The same zone keeps failing: `Warn` on every tick until the streak
//!    reaches [`FAULT_ESCALATION_TICKS`], `Error` from then on.
//! 3. The zone reads again: the bit clears and recovery is logged.
//!
//! Emergency breaches are logged at `error!` on every tick they persist.
//! Multiple faults may be active at once.

use core::fmt;

use log::{error, info};

use crate::error::ActuatorError;
use crate::telemetry::ZoneSweep;
use crate::thresholds::{ThresholdTable, Zone, ZoneReadings};

/// Consecutive failing ticks after which a telemetry fault is an error.
pub const FAULT_ESCALATION_TICKS: u32 = 3;

// ---------------------------------------------------------------------------
// Fault identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    AmbientUnavailable = 0b0000_0001,
    FloorUnavailable = 0b0000_0010,
    HotUnavailable = 0b0000_0100,
    ColdUnavailable = 0b0000_1000,
    /// Hot aisle at or above its emergency threshold.
    EmergencyBreach = 0b0001_0000,
    /// Last actuator apply failed.
    ActuatorFault = 0b0010_0000,
}

impl Fault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    pub const fn unavailable(zone: Zone) -> Self {
        match zone {
            Zone::Ambient => Self::AmbientUnavailable,
            Zone::Floor => Self::FloorUnavailable,
            Zone::Hot => Self::HotUnavailable,
            Zone::Cold => Self::ColdUnavailable,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbientUnavailable => write!(f, "ambient telemetry unavailable"),
            Self::FloorUnavailable => write!(f, "floor telemetry unavailable"),
            Self::HotUnavailable => write!(f, "hot aisle telemetry unavailable"),
            Self::ColdUnavailable => write!(f, "cold aisle telemetry unavailable"),
            Self::EmergencyBreach => write!(f, "emergency threshold breached"),
            Self::ActuatorFault => write!(f, "actuator fault"),
        }
    }
}

/// Log level a fault report was emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

pub struct FaultSupervisor {
    /// Latched fault bitmask.
    faults: u8,
    /// Consecutive failing ticks per zone, indexed by `Zone as usize`.
    streaks: [u32; Zone::COUNT],
}

impl Default for FaultSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultSupervisor {
    pub const fn new() -> Self {
        Self {
            faults: 0,
            streaks: [0; Zone::COUNT],
        }
    }

    /// Record the outcome of a zone sweep.  Returns the severity of every
    /// fault reported this tick, in `Zone::ALL` order.
    pub fn record_sweep(&mut self, sweep: &ZoneSweep) -> heapless::Vec<(Zone, Severity), { Zone::COUNT }> {
        let mut reported = heapless::Vec::new();
        for zone in Zone::ALL {
            match sweep.fault_for(zone) {
                Some(_) => {
                    let sev = self.zone_failed(zone);
                    let _ = reported.push((zone, sev));
                }
                None => self.zone_recovered(zone),
            }
        }
        reported
    }

    /// Latch or clear the emergency-breach bit.  Every tick in breach is
    /// reported at `error!`.
    pub fn record_readings(&mut self, readings: &ZoneReadings, table: &ThresholdTable) -> bool {
        let breach = match (readings.hot, table.hot.thresholds.emergency) {
            (Some(hot), Some(limit)) => hot >= limit,
            _ => false,
        };
        if breach {
            error!(
                "FAULT | {}: {} {:.1}\u{00b0}C",
                Fault::EmergencyBreach,
                Zone::Hot.label(),
                readings.hot.unwrap_or_default()
            );
            self.faults |= Fault::EmergencyBreach.mask();
        } else {
            self.clear(Fault::EmergencyBreach);
        }
        breach
    }

    pub fn record_actuator(&mut self, result: &Result<(), ActuatorError>) {
        match result {
            // Logged by the event sink.
            Err(_) => self.faults |= Fault::ActuatorFault.mask(),
            Ok(()) => self.clear(Fault::ActuatorFault),
        }
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: Fault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Consecutive failing ticks for `zone`.
    pub fn streak(&self, zone: Zone) -> u32 {
        self.streaks[zone as usize]
    }

    // ── Internal ──────────────────────────────────────────────────

    // Logged by the event sink at the returned severity.
    fn zone_failed(&mut self, zone: Zone) -> Severity {
        let streak = &mut self.streaks[zone as usize];
        *streak = streak.saturating_add(1);
        let n = *streak;
        self.faults |= Fault::unavailable(zone).mask();

        match n {
            1 => Severity::Info,
            n if n < FAULT_ESCALATION_TICKS => Severity::Warn,
            _ => Severity::Error,
        }
    }

    fn zone_recovered(&mut self, zone: Zone) {
        let streak = &mut self.streaks[zone as usize];
        if *streak > 0 {
            info!("FAULT | {} reading recovered after {} ticks", zone.label(), streak);
            *streak = 0;
        }
        self.clear(Fault::unavailable(zone));
    }

    /// Unconditionally clear a fault bit.
    fn clear(&mut self, fault: Fault) {
        if self.faults & fault.mask() != 0 {
            info!("FAULT | cleared: {fault}");
        }
        self.faults &= !fault.mask();
    }
}
