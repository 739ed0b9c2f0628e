//! GPIO pin assignments for the EnviroZen relay board.
//!
//! Single source of truth: the relay bank is built from this module
//! rather than hard-coding pin numbers.  Polarity lives with the relay
//! identity in [`crate::drivers::relay::Relay::polarity`].

use crate::drivers::relay::Relay;

// ---------------------------------------------------------------------------
// Relay outputs (4-channel opto-isolated relay module)
// ---------------------------------------------------------------------------

/// Fan 1 relay coil (active HIGH).
pub const FAN1_GPIO: i32 = 38;
/// Fan 2 relay coil (active HIGH).
pub const FAN2_GPIO: i32 = 39;
/// Air-conditioning relay (active LOW: unit runs when the board is unpowered).
pub const AC_GPIO: i32 = 40;
/// Air damper actuator relay (active HIGH = open).
pub const DAMPER_GPIO: i32 = 41;

/// GPIO for a relay.
pub const fn relay_gpio(relay: Relay) -> i32 {
    match relay {
        Relay::Damper => DAMPER_GPIO,
        Relay::Fan1 => FAN1_GPIO,
        Relay::Fan2 => FAN2_GPIO,
        Relay::Ac => AC_GPIO,
    }
}
