//! Cooling modes, their actuator signal combinations, and the operator's
//! operation mode.
//!
//! ```text
//! ┌──────────────────┬──────────┬───────┬──────┬──────┬───────────────────────┐
//! │ CoolingMode      │ Damper   │ Fan1  │ Fan2 │ AC   │ route                 │
//! ├──────────────────┼──────────┼───────┼──────┼──────┼───────────────────────┤
//! │ AcOn             │ closed   │ off   │ off  │ on   │ /ac                   │
//! │ FreeCooling      │ open     │ on    │ off  │ off  │ /freecooling          │
//! │ FreeCoolingTurbo │ open     │ on    │ on   │ off  │ /freecooling_turbo    │
//! │ PassiveCooling   │ open     │ off   │ off  │ off  │ /passive              │
//! │ Emergency        │ open     │ on    │ on   │ on   │ /emergency            │
//! └──────────────────┴──────────┴───────┴──────┴──────┴───────────────────────┘
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Actuator signals
// ---------------------------------------------------------------------------

/// Logical on/off state of the four outputs.  Polarity is applied by the
/// relay driver, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActuatorSignals {
    pub damper_open: bool,
    pub fan1: bool,
    pub fan2: bool,
    pub ac: bool,
}

// ---------------------------------------------------------------------------
// Cooling mode identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CoolingMode {
    AcOn = 0,
    FreeCooling = 1,
    FreeCoolingTurbo = 2,
    PassiveCooling = 3,
    Emergency = 4,
}

/// Static descriptor for a single cooling mode.
/// Stored in a fixed-size array indexed by `CoolingMode as usize`.
pub struct ModeDescriptor {
    pub mode: CoolingMode,
    pub name: &'static str,
    pub route: &'static str,
    pub signals: ActuatorSignals,
}

const fn signals(damper_open: bool, fan1: bool, fan2: bool, ac: bool) -> ActuatorSignals {
    ActuatorSignals {
        damper_open,
        fan1,
        fan2,
        ac,
    }
}

static MODE_TABLE: [ModeDescriptor; CoolingMode::COUNT] = [
    // Index 0: AcOn
    ModeDescriptor {
        mode: CoolingMode::AcOn,
        name: "AC",
        route: "/ac",
        signals: signals(false, false, false, true),
    },
    // Index 1: FreeCooling
    ModeDescriptor {
        mode: CoolingMode::FreeCooling,
        name: "Free Cooling",
        route: "/freecooling",
        signals: signals(true, true, false, false),
    },
    // Index 2: FreeCoolingTurbo
    ModeDescriptor {
        mode: CoolingMode::FreeCoolingTurbo,
        name: "Free Cooling Turbo",
        route: "/freecooling_turbo",
        signals: signals(true, true, true, false),
    },
    // Index 3: PassiveCooling
    ModeDescriptor {
        mode: CoolingMode::PassiveCooling,
        name: "Passive Cooling",
        route: "/passive",
        signals: signals(true, false, false, false),
    },
    // Index 4: Emergency
    ModeDescriptor {
        mode: CoolingMode::Emergency,
        name: "Emergency",
        route: "/emergency",
        signals: signals(true, true, true, true),
    },
];

impl CoolingMode {
    /// Total number of modes, used to size the descriptor table.
    pub const COUNT: usize = 5;

    pub const ALL: [CoolingMode; CoolingMode::COUNT] = [
        CoolingMode::AcOn,
        CoolingMode::FreeCooling,
        CoolingMode::FreeCoolingTurbo,
        CoolingMode::PassiveCooling,
        CoolingMode::Emergency,
    ];

    /// Convert a stored index back to a mode.  Out-of-range yields `None`.
    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    fn descriptor(self) -> &'static ModeDescriptor {
        &MODE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Override-surface path that forces this mode.
    pub fn route(self) -> &'static str {
        self.descriptor().route
    }

    /// The exact output combination for this mode.
    pub fn signals(self) -> ActuatorSignals {
        self.descriptor().signals
    }

    pub fn from_route(path: &str) -> Option<Self> {
        MODE_TABLE.iter().find(|d| d.route == path).map(|d| d.mode)
    }

    /// Operation mode an operator override into this mode implies.
    pub fn override_operation(self) -> OperationMode {
        match self {
            Self::Emergency => OperationMode::Emergency,
            _ => OperationMode::Manual,
        }
    }
}

impl fmt::Display for CoolingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Operation mode
// ---------------------------------------------------------------------------

/// Who is in charge of the outputs: the decision engine or an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum OperationMode {
    #[default]
    Automatic = 0,
    Manual = 1,
    Emergency = 2,
}

impl OperationMode {
    /// Persisted spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::Emergency => "emergency",
        }
    }

    /// Parse a persisted value.  Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "automatic" => Some(Self::Automatic),
            "manual" => Some(Self::Manual),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Manual,
            2 => Self::Emergency,
            _ => Self::Automatic,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
