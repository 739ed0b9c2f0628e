//! Control-loop timing and the startup backend probe.
//!
//! ```text
//!   boot ──▶ wait_for_backend ──(Backoff: 2s → 4s → … ≤ 60s)──▶ fatal
//!                 │ reachable
//!                 ▼
//!   loop { Scheduler::poll(now, reevaluate) ─▶ Some(reason) ─▶ ControlService::tick }
//! ```
//!
//! The scheduler knows nothing about telemetry or relays: it only says
//! *when* a tick is due.  A tick is due on the first poll, every
//! `interval_secs` afterwards, and immediately when the override surface
//! requests a re-evaluation.

use core::fmt;

use log::{error, info, warn};

use crate::error::TelemetryError;

// ═══════════════════════════════════════════════════════════════
//  Tick scheduling
// ═══════════════════════════════════════════════════════════════

/// Why a tick was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReason {
    First,
    Interval,
    Reevaluate,
}

impl fmt::Display for TickReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Interval => write!(f, "interval"),
            Self::Reevaluate => write!(f, "re-evaluate"),
        }
    }
}

pub struct Scheduler {
    interval_secs: u64,
    /// Monotonic seconds of the last released tick.
    last_tick: Option<u64>,
}

impl Scheduler {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs: u64::from(interval_secs.max(1)),
            last_tick: None,
        }
    }

    /// Decide whether a tick is due at `now`.  `reevaluate` forces one.
    pub fn poll(&mut self, now: u64, reevaluate: bool) -> Option<TickReason> {
        let reason = match self.last_tick {
            None => TickReason::First,
            Some(_) if reevaluate => TickReason::Reevaluate,
            Some(last) if now.saturating_sub(last) >= self.interval_secs => TickReason::Interval,
            Some(_) => return None,
        };
        self.last_tick = Some(now);
        Some(reason)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

// ═══════════════════════════════════════════════════════════════
//  Startup probe
// ═══════════════════════════════════════════════════════════════

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

/// Exponential backoff: 2 s, doubling, capped at 60 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next_secs: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            next_secs: INITIAL_BACKOFF_SECS,
        }
    }

    /// Delay to wait now; advances the sequence.
    pub fn next_delay(&mut self) -> u32 {
        let d = self.next_secs;
        self.next_secs = (self.next_secs * 2).min(MAX_BACKOFF_SECS);
        d
    }
}

/// Probe the backend up to `attempts` times, sleeping with [`Backoff`]
/// between failures.  Returns the last error if it is never reachable.
pub fn wait_for_backend(
    mut probe: impl FnMut() -> Result<(), TelemetryError>,
    attempts: u8,
    mut sleep_secs: impl FnMut(u32),
) -> Result<(), TelemetryError> {
    let attempts = attempts.max(1);
    let mut backoff = Backoff::new();
    let mut last = TelemetryError::TransportFailure;

    for attempt in 1..=attempts {
        match probe() {
            Ok(()) => {
                info!("Backend reachable (attempt {}/{})", attempt, attempts);
                return Ok(());
            }
            Err(e) => {
                last = e;
                if attempt == attempts {
                    break;
                }
                let delay = backoff.next_delay();
                warn!(
                    "Backend probe {}/{} failed: {} (retry in {}s)",
                    attempt, attempts, e, delay
                );
                sleep_secs(delay);
            }
        }
    }

    error!("Backend unreachable after {} attempts: {}", attempts, last);
    Err(last)
}
