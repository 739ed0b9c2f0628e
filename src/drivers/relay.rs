//! Relay output driver.
//!
//! Each of the four cooling outputs is a relay coil on a digital GPIO.
//! The driver converts a logical on/off request into an electrical level
//! using the relay's polarity:
//!
//! | Relay  | Polarity    | "on" drives | de-energised controller |
//! |--------|-------------|-------------|-------------------------|
//! | Damper | active-high | HIGH        | damper closed           |
//! | Fan 1  | active-high | HIGH        | fan off                 |
//! | Fan 2  | active-high | HIGH        | fan off                 |
//! | AC     | active-low  | LOW         | AC cooling              |
//!
//! Generic over [`embedded_hal::digital::OutputPin`]: on ESP-IDF the pin is
//! an `esp_idf_hal::gpio::PinDriver`; on host it is a simulated pin.

use core::fmt;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Relay {
    Damper = 0,
    Fan1 = 1,
    Fan2 = 2,
    Ac = 3,
}

impl Relay {
    pub const COUNT: usize = 4;

    /// Write order used by the relay bank.
    pub const ALL: [Relay; Relay::COUNT] = [Relay::Damper, Relay::Fan1, Relay::Fan2, Relay::Ac];

    pub fn name(self) -> &'static str {
        match self {
            Self::Damper => "damper",
            Self::Fan1 => "fan1",
            Self::Fan2 => "fan2",
            Self::Ac => "AC",
        }
    }

    /// Wiring polarity for this relay on the controller board.
    pub const fn polarity(self) -> Polarity {
        match self {
            Self::Ac => Polarity::ActiveLow,
            _ => Polarity::ActiveHigh,
        }
    }
}

impl fmt::Display for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Electrical level (true = HIGH) that realises the logical state.
    pub const fn level(self, on: bool) -> bool {
        match self {
            Self::ActiveHigh => on,
            Self::ActiveLow => !on,
        }
    }
}

pub struct RelayDriver<P> {
    relay: Relay,
    pin: P,
    /// Logical state last written successfully.
    state: Option<bool>,
}

impl<P: OutputPin> RelayDriver<P> {
    pub fn new(relay: Relay, pin: P) -> Self {
        Self {
            relay,
            pin,
            state: None,
        }
    }

    /// Drive the relay to the logical state `on`.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = self.relay.polarity().level(on);
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => {
                self.state = Some(on);
                Ok(())
            }
            Err(e) => {
                warn!("{} relay: GPIO write failed: {:?}", self.relay, e);
                self.state = None;
                Err(ActuatorError::RelayWriteFailed(self.relay))
            }
        }
    }

    pub fn relay(&self) -> Relay {
        self.relay
    }

    /// Logical state, `None` until the first successful write or after a
    /// failed one.
    pub fn state(&self) -> Option<bool> {
        self.state
    }
}
