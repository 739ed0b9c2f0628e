//! Zone identities, per-zone thresholds and the threshold table.
//!
//! The table is loaded once (defaults or NVS), validated, and then only
//! ever read.  Each zone carries the metric selector the telemetry
//! gateway uses to fetch it.
//!
//! ```text
//!   minimum ──── elevated ──── warning ──── emergency     (°C, ascending)
//!   passive │ free cooling │ turbo │  AC  │ emergency     (cold / hot aisle)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Margin below `cold.warning` used when no explicit `elevated` tier is
/// configured for the cold aisle.
pub const DEFAULT_ELEVATED_MARGIN_C: f32 = 2.0;

// ---------------------------------------------------------------------------
// Zone identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Zone {
    Ambient = 0,
    Floor = 1,
    Hot = 2,
    Cold = 3,
}

impl Zone {
    pub const COUNT: usize = 4;

    pub const ALL: [Zone; Zone::COUNT] = [Zone::Ambient, Zone::Floor, Zone::Hot, Zone::Cold];

    /// Zones whose readings gate every decision.  `Floor` is collected
    /// for status only.
    pub const REQUIRED: [Zone; 3] = [Zone::Ambient, Zone::Hot, Zone::Cold];

    /// Short identifier used in metric selectors and JSON.
    pub fn id(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Floor => "floor",
            Self::Hot => "hot",
            Self::Cold => "cold",
        }
    }

    /// Human-readable label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ambient => "Ambient Temperature",
            Self::Floor => "Under Floor Temperature",
            Self::Hot => "Hot Aisle Temperature",
            Self::Cold => "Cold Aisle Temperature",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Threshold tiers for one zone (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// At or above this the zone demands refrigeration.
    pub warning: f32,
    /// At or above this every actuator is engaged.
    #[serde(default)]
    pub emergency: Option<f32>,
    /// Escalation tier below `warning` (cold aisle: turbo free cooling).
    #[serde(default)]
    pub elevated: Option<f32>,
    /// Below this the zone is over-cooled.
    #[serde(default)]
    pub minimum: Option<f32>,
}

impl Thresholds {
    pub const fn warning(warning: f32) -> Self {
        Self {
            warning,
            emergency: None,
            elevated: None,
            minimum: None,
        }
    }

    /// The elevated tier, falling back to `warning - DEFAULT_ELEVATED_MARGIN_C`.
    pub fn elevated_or_default(&self) -> f32 {
        self.elevated
            .unwrap_or(self.warning - DEFAULT_ELEVATED_MARGIN_C)
    }

    /// Check that the tiers are finite and strictly ascending.
    fn validate(&self, zone: Zone) -> Result<(), ConfigError> {
        let tiers = [
            self.minimum,
            self.elevated,
            Some(self.warning),
            self.emergency,
        ];
        if tiers.iter().flatten().any(|t| !t.is_finite()) {
            return Err(ConfigError::ValidationFailed(match zone {
                Zone::Ambient => "ambient thresholds must be finite",
                Zone::Floor => "floor thresholds must be finite",
                Zone::Hot => "hot thresholds must be finite",
                Zone::Cold => "cold thresholds must be finite",
            }));
        }
        let mut prev: Option<f32> = None;
        for tier in tiers.into_iter().flatten() {
            if prev.is_some_and(|p| p >= tier) {
                return Err(ConfigError::ValidationFailed(match zone {
                    Zone::Ambient => "ambient thresholds must ascend minimum < elevated < warning < emergency",
                    Zone::Floor => "floor thresholds must ascend minimum < elevated < warning < emergency",
                    Zone::Hot => "hot thresholds must ascend minimum < elevated < warning < emergency",
                    Zone::Cold => "cold thresholds must ascend minimum < elevated < warning < emergency",
                }));
            }
            prev = Some(tier);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Threshold table
// ---------------------------------------------------------------------------

/// One row of the table: where to fetch the zone and how to judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Metric selector, e.g. `temperature{location="hot"}`.
    pub query: String,
    pub thresholds: Thresholds,
}

impl ZoneConfig {
    fn for_zone(zone: Zone, thresholds: Thresholds) -> Self {
        Self {
            query: format!("temperature{{location=\"{}\"}}", zone.id()),
            thresholds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub ambient: ZoneConfig,
    pub floor: ZoneConfig,
    pub hot: ZoneConfig,
    pub cold: ZoneConfig,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            ambient: ZoneConfig::for_zone(Zone::Ambient, Thresholds::warning(25.0)),
            floor: ZoneConfig::for_zone(Zone::Floor, Thresholds::warning(30.0)),
            hot: ZoneConfig::for_zone(
                Zone::Hot,
                Thresholds {
                    emergency: Some(36.0),
                    ..Thresholds::warning(30.0)
                },
            ),
            cold: ZoneConfig::for_zone(
                Zone::Cold,
                Thresholds {
                    elevated: Some(18.0),
                    minimum: Some(10.0),
                    ..Thresholds::warning(20.0)
                },
            ),
        }
    }
}

impl ThresholdTable {
    pub fn get(&self, zone: Zone) -> &ZoneConfig {
        match zone {
            Zone::Ambient => &self.ambient,
            Zone::Floor => &self.floor,
            Zone::Hot => &self.hot,
            Zone::Cold => &self.cold,
        }
    }

    pub fn thresholds(&self, zone: Zone) -> &Thresholds {
        &self.get(zone).thresholds
    }

    /// Reject tables the decision engine cannot act on safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for zone in Zone::ALL {
            let row = self.get(zone);
            if row.query.trim().is_empty() {
                return Err(ConfigError::ValidationFailed("every zone needs a metric query"));
            }
            row.thresholds.validate(zone)?;
        }
        if self.hot.thresholds.emergency.is_none() {
            return Err(ConfigError::ValidationFailed("hot.emergency must be set"));
        }
        let cold = &self.cold.thresholds;
        let Some(minimum) = cold.minimum else {
            return Err(ConfigError::ValidationFailed("cold.minimum must be set"));
        };
        let elevated = cold.elevated_or_default();
        if !(minimum < elevated && elevated < cold.warning) {
            return Err(ConfigError::ValidationFailed(
                "cold.elevated must lie between cold.minimum and cold.warning",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Latest reading per zone; `None` when telemetry was unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneReadings {
    pub ambient: Option<f32>,
    pub floor: Option<f32>,
    pub hot: Option<f32>,
    pub cold: Option<f32>,
}

impl ZoneReadings {
    pub fn get(&self, zone: Zone) -> Option<f32> {
        match zone {
            Zone::Ambient => self.ambient,
            Zone::Floor => self.floor,
            Zone::Hot => self.hot,
            Zone::Cold => self.cold,
        }
    }

    pub fn set(&mut self, zone: Zone, value: Option<f32>) {
        match zone {
            Zone::Ambient => self.ambient = value,
            Zone::Floor => self.floor = value,
            Zone::Hot => self.hot = value,
            Zone::Cold => self.cold = value,
        }
    }

    /// First required zone without a reading, in `Zone::REQUIRED` order.
    pub fn first_missing(&self) -> Option<Zone> {
        Zone::REQUIRED.into_iter().find(|z| self.get(*z).is_none())
    }
}
