//! System configuration parameters
//!
//! All tunable parameters for the EnviroZen controller.
//! Values can be overridden via NVS (non-volatile storage); anything
//! loaded must pass [`SystemConfig::validate`] before the loop starts.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::engine::DEFAULT_MIN_AC_RUN_SECS;
use crate::thresholds::ThresholdTable;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Telemetry backend ---
    /// Prometheus base URL, e.g. `http://192.168.88.72:9090`
    pub backend_url: String,
    /// Per-request timeout for backend queries (milliseconds)
    pub http_timeout_ms: u32,
    /// Backend probes attempted at startup before giving up
    pub startup_probe_attempts: u8,

    // --- Zones ---
    /// Metric query and thresholds per zone
    pub zones: ThresholdTable,

    // --- Timing ---
    /// Seconds between automatic evaluations
    pub evaluation_interval_secs: u32,
    /// Minimum compressor run time once AC mode is entered (seconds)
    pub min_ac_run_time_secs: u32,

    // --- Override surface ---
    /// TCP port of the status / override HTTP server
    pub override_port: u16,

    // --- Commissioning ---
    /// Pulse every relay once at boot before entering the loop
    pub relay_self_test: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Backend
            backend_url: "http://192.168.88.72:9090".into(),
            http_timeout_ms: 5_000,
            startup_probe_attempts: 5,

            // Zones
            zones: ThresholdTable::default(),

            // Timing
            evaluation_interval_secs: 10,
            min_ac_run_time_secs: DEFAULT_MIN_AC_RUN_SECS as u32,

            // Override surface
            override_port: 80,

            relay_self_test: false,
        }
    }
}

impl SystemConfig {
    /// Reject configurations the controller cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        if !url.starts_with("http://") || url.len() <= "http://".len() {
            return Err(ConfigError::ValidationFailed(
                "backend_url must be an http:// URL",
            ));
        }
        if !(1..=3600).contains(&self.evaluation_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "evaluation_interval_secs must be 1..=3600",
            ));
        }
        if self.min_ac_run_time_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "min_ac_run_time_secs must be 0..=3600",
            ));
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("http_timeout_ms must be > 0"));
        }
        if self.startup_probe_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "startup_probe_attempts must be > 0",
            ));
        }
        if self.override_port == 0 {
            return Err(ConfigError::ValidationFailed("override_port must be > 0"));
        }
        self.zones.validate()
    }

    /// Backend URL without a trailing slash.
    pub fn backend_base(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }
}
