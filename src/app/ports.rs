//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (telemetry backend, relay bank, event sinks, storage)
//! implement these traits.  The [`ControlService`](super::service::ControlService)
//! consumes them via generics, so the decision core never touches the
//! network or GPIO directly.
//!
//! ## Safety notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **ActuatorPort** implementations MUST apply all four outputs as one
//!   combination; no observer may see a partial mode.
//! - All port errors are typed: callers must handle every variant explicitly.

use crate::config::SystemConfig;
use crate::engine::modes::{ActuatorSignals, CoolingMode, OperationMode};
use crate::error::{ActuatorError, TelemetryError};

// ───────────────────────────────────────────────────────────────
// Telemetry ports (driven adapter: metrics backend → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: fetch the current value of one metric selector.
pub trait TelemetrySource {
    /// Return the most recent numeric reading for `query`.
    ///
    /// An empty result set is [`TelemetryError::NoData`], never `0.0`.
    fn fetch(&mut self, query: &str) -> Result<f32, TelemetryError>;
}

/// A raw HTTP reply as seen by the telemetry gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal blocking HTTP GET used by the telemetry gateway.
///
/// Implementations own timeouts; a timeout is reported as
/// [`TelemetryError::TransportFailure`].
pub trait HttpTransport {
    fn get(&mut self, url: &str) -> Result<HttpReply, TelemetryError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → relays)
// ───────────────────────────────────────────────────────────────

/// Write-side port: drive the four cooling outputs into a named mode.
pub trait ActuatorPort {
    /// Apply `mode`.  Idempotent: applying the same mode twice leaves the
    /// outputs unchanged.
    fn apply(&mut self, mode: CoolingMode) -> Result<(), ActuatorError>;

    /// Apply `mode` only if `gate` returns true.  `gate` runs while the
    /// outputs are held exclusively, so a shared actuator serialises it
    /// against every other writer.  Returns `Ok(false)` when refused.
    fn apply_guarded(
        &mut self,
        mode: CoolingMode,
        gate: &mut dyn FnMut() -> bool,
    ) -> Result<bool, ActuatorError> {
        if !gate() {
            return Ok(false);
        }
        self.apply(mode).map(|()| true)
    }

    /// The last combination applied successfully, if any.
    fn signals(&self) -> Option<ActuatorSignals>;
}

// ───────────────────────────────────────────────────────────────
// Operation-mode port (driven adapter: override surface → domain)
// ───────────────────────────────────────────────────────────────

/// Read-only view of the operator's auto/manual/emergency selection.
pub trait OperationModeSource {
    fn current(&self) -> OperationMode;

    /// The mode the operator forced, when not automatic.
    fn forced_mode(&self) -> Option<CoolingMode> {
        None
    }

    /// Consume the last mode an operator drove onto the outputs, if one
    /// was applied since the previous call.  Survives a return to
    /// automatic, so the loop learns about an override it never saw.
    fn take_applied_override(&self) -> Option<CoolingMode> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// status page, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid threshold orderings are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (operation-mode flag, config blob).
///
/// Write operations MUST be atomic: no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively; in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
