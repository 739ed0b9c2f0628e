//! Hardware adapter: bridges the relay board to the actuator port.
//!
//! [`RelayBank`] owns the four relay drivers and exposes them through
//! [`ActuatorPort`].  This is the only module in the system that touches
//! output pins.  [`SharedActuator`] puts one bank behind a mutex so the
//! control loop and the override server drive the same outputs without
//! either observing a half-applied mode.
//!
//! ```text
//!  ControlService ──┐
//!                   ├──▶ SharedActuator ──▶ Mutex<RelayBank> ──▶ 4 × RelayDriver
//!  OverrideHandler ─┘
//! ```

use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::ActuatorPort;
use crate::drivers::relay::{Relay, RelayDriver};
use crate::engine::modes::{ActuatorSignals, CoolingMode};
use crate::error::ActuatorError;

// ── Relay bank ────────────────────────────────────────────────

pub struct RelayBank<P> {
    /// Indexed by `Relay as usize`, which is also the write order.
    relays: [RelayDriver<P>; Relay::COUNT],
    /// Signals last applied in full; `None` after any failed write.
    applied: Option<ActuatorSignals>,
}

fn wanted(signals: &ActuatorSignals, relay: Relay) -> bool {
    match relay {
        Relay::Damper => signals.damper_open,
        Relay::Fan1 => signals.fan1,
        Relay::Fan2 => signals.fan2,
        Relay::Ac => signals.ac,
    }
}

impl<P: OutputPin> RelayBank<P> {
    pub fn new(damper: P, fan1: P, fan2: P, ac: P) -> Self {
        Self {
            relays: [
                RelayDriver::new(Relay::Damper, damper),
                RelayDriver::new(Relay::Fan1, fan1),
                RelayDriver::new(Relay::Fan2, fan2),
                RelayDriver::new(Relay::Ac, ac),
            ],
            applied: None,
        }
    }

    /// Drive all four relays to `signals`.  Stops at the first failing
    /// relay and invalidates the cache so the next apply rewrites all.
    pub fn write_signals(&mut self, signals: ActuatorSignals) -> Result<(), ActuatorError> {
        if self.applied == Some(signals) {
            return Ok(());
        }
        for driver in &mut self.relays {
            let on = wanted(&signals, driver.relay());
            if let Err(e) = driver.set(on) {
                self.applied = None;
                return Err(e);
            }
        }
        self.applied = Some(signals);
        Ok(())
    }

    /// Pulse each relay in turn for `dwell_ms`, then restore the last
    /// applied combination (or leave everything released if none).
    pub fn self_test(&mut self, delay: &mut impl DelayNs, dwell_ms: u32) -> Result<(), ActuatorError> {
        let restore = self.applied.take();
        info!("Relay self-test: {} relays, {}ms each", Relay::COUNT, dwell_ms);

        for driver in &mut self.relays {
            let idle = restore.is_some_and(|s| wanted(&s, driver.relay()));
            driver.set(!idle)?;
            delay.delay_ms(dwell_ms);
            driver.set(idle)?;
            info!("Relay self-test: {} OK", driver.relay());
        }

        if let Some(signals) = restore {
            self.write_signals(signals)?;
        }
        Ok(())
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin> ActuatorPort for RelayBank<P> {
    fn apply(&mut self, mode: CoolingMode) -> Result<(), ActuatorError> {
        self.write_signals(mode.signals())
    }

    fn signals(&self) -> Option<ActuatorSignals> {
        self.applied
    }
}

// ── Shared handle ─────────────────────────────────────────────

/// Cloneable handle to one actuator behind a mutex.
pub struct SharedActuator<A> {
    inner: Arc<Mutex<A>>,
}

impl<A> Clone for SharedActuator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ActuatorPort> SharedActuator<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(actuator)),
        }
    }

    /// Run `f` with exclusive access to the actuator.
    pub fn with<T>(&self, f: impl FnOnce(&mut A) -> T) -> Result<T, ActuatorError> {
        let mut guard = self.inner.lock().map_err(|_| {
            warn!("SharedActuator: lock poisoned");
            ActuatorError::LockPoisoned
        })?;
        Ok(f(&mut guard))
    }
}

impl<A: ActuatorPort> ActuatorPort for SharedActuator<A> {
    fn apply(&mut self, mode: CoolingMode) -> Result<(), ActuatorError> {
        self.with(|a| a.apply(mode))?
    }

    fn apply_guarded(
        &mut self,
        mode: CoolingMode,
        gate: &mut dyn FnMut() -> bool,
    ) -> Result<bool, ActuatorError> {
        self.with(|a| a.apply_guarded(mode, gate))?
    }

    fn signals(&self) -> Option<ActuatorSignals> {
        self.with(|a| a.signals()).ok().flatten()
    }
}

// ── Simulated output pin (host) ───────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::SimOutputPin;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

    /// In-memory output pin.  Clones observe and control the same pin,
    /// so a test can keep a handle while the bank owns another.
    #[derive(Clone, Default)]
    pub struct SimOutputPin {
        high: Arc<AtomicBool>,
        fail: Arc<AtomicBool>,
        writes: Arc<AtomicU32>,
    }

    impl SimOutputPin {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_high(&self) -> bool {
            self.high.load(Ordering::SeqCst)
        }

        /// Make every subsequent write fail until cleared.
        pub fn inject_failure(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        /// Successful writes so far.
        pub fn writes(&self) -> u32 {
            self.writes.load(Ordering::SeqCst)
        }

        fn drive(&mut self, high: bool) -> Result<(), ErrorKind> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ErrorKind::Other);
            }
            self.high.store(high, Ordering::SeqCst);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ErrorType for SimOutputPin {
        type Error = ErrorKind;
    }

    impl OutputPin for SimOutputPin {
        fn set_low(&mut self) -> Result<(), ErrorKind> {
            self.drive(false)
        }

        fn set_high(&mut self) -> Result<(), ErrorKind> {
            self.drive(true)
        }
    }
}
