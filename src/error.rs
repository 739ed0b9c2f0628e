//! Unified error types for the EnviroZen controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! control loop and `main` handle failures uniformly.  All variants are
//! `Copy` so they can be passed through the fault supervisor and the
//! event sink without allocation.
//!
//! | Category  | Raised by            | Policy                                  |
//! |-----------|----------------------|-----------------------------------------|
//! | Config    | config / NVS load    | fatal at startup                        |
//! | Telemetry | telemetry gateway    | per tick, logged, tick skipped          |
//! | Actuator  | relay bank           | reported at `error!`, re-applied next tick |
//! | Storage   | NVS adapter          | logged, flag persistence best-effort    |

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::drivers::relay::Relay;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A zone reading could not be obtained from the metrics backend.
    Telemetry(TelemetryError),
    /// A relay output could not be asserted.
    Actuator(ActuatorError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Persistent storage failed.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telemetry(e) => write!(f, "telemetry: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

/// Why a zone reading is unavailable this tick.
///
/// `NoData` is deliberately distinct from a zero reading: an empty result
/// set must never be treated as 0 °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The query selector was empty or otherwise unusable.
    QueryInvalid,
    /// Network failure, timeout, or an unreadable response body.
    TransportFailure,
    /// The backend answered with a non-success status.
    BackendError,
    /// The query succeeded but returned no usable sample.
    NoData,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryInvalid => write!(f, "query invalid"),
            Self::TransportFailure => write!(f, "transport failure"),
            Self::BackendError => write!(f, "backend error"),
            Self::NoData => write!(f, "no data"),
        }
    }
}

impl From<TelemetryError> for Error {
    fn from(e: TelemetryError) -> Self {
        Self::Telemetry(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Driving the relay's GPIO failed.
    RelayWriteFailed(Relay),
    /// Another holder of the shared relay bank panicked mid-update.
    LockPoisoned,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayWriteFailed(relay) => write!(f, "{} relay write failed", relay.name()),
            Self::LockPoisoned => write!(f, "relay bank lock poisoned"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Port error conversions
// ---------------------------------------------------------------------------

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
