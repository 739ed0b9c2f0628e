//! Shared operation-mode flag.
//!
//! Written by the override surface, read by the control loop.  All
//! fields are atomics behind `Arc`s: last write wins, readers never block.
//!
//! Persisted in NVS namespace `envirozen`:
//!
//! | key      | value                                   |
//! |----------|-----------------------------------------|
//! | `opmode` | `automatic` \| `manual` \| `emergency`  |
//! | `forced` | one byte, `CoolingMode as u8`; absent in automatic |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::{info, warn};

use crate::adapters::nvs::NAMESPACE;
use crate::engine::modes::{CoolingMode, OperationMode};

use super::ports::{OperationModeSource, StorageError, StoragePort};

const OPMODE_KEY: &str = "opmode";
const FORCED_KEY: &str = "forced";
const NO_FORCED_MODE: u8 = 0xFF;

#[derive(Clone)]
pub struct ModeFlag {
    operation: Arc<AtomicU8>,
    forced: Arc<AtomicU8>,
    /// Mode last driven by an operator and not yet seen by the loop.
    applied: Arc<AtomicU8>,
    reevaluate: Arc<AtomicBool>,
}

impl Default for ModeFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeFlag {
    /// A fresh flag in automatic mode.
    pub fn new() -> Self {
        Self {
            operation: Arc::new(AtomicU8::new(OperationMode::Automatic as u8)),
            forced: Arc::new(AtomicU8::new(NO_FORCED_MODE)),
            applied: Arc::new(AtomicU8::new(NO_FORCED_MODE)),
            reevaluate: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the operation mode and the forced cooling mode together.
    /// `forced` is ignored in automatic mode.
    pub fn set(&self, operation: OperationMode, forced: Option<CoolingMode>) {
        let forced = match operation {
            OperationMode::Automatic => NO_FORCED_MODE,
            _ => forced.map_or(NO_FORCED_MODE, |m| m as u8),
        };
        self.forced.store(forced, Ordering::SeqCst);
        self.operation.store(operation as u8, Ordering::SeqCst);
    }

    /// Record that `mode` is now on the outputs by operator action.
    /// The control loop folds it into its state on its next tick, even
    /// if automatic control has resumed by then.
    pub fn note_applied(&self, mode: CoolingMode) {
        self.applied.store(mode as u8, Ordering::SeqCst);
    }

    /// Ask the control loop to run a tick as soon as possible.
    pub fn request_reevaluation(&self) {
        self.reevaluate.store(true, Ordering::SeqCst);
    }

    /// Consume a pending re-evaluation request.
    pub fn take_reevaluation(&self) -> bool {
        self.reevaluate.swap(false, Ordering::SeqCst)
    }

    /// Write the current flag to storage.
    pub fn persist(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let op = self.current();
        storage.write(NAMESPACE, OPMODE_KEY, op.as_str().as_bytes())?;
        match self.forced_mode() {
            Some(mode) => storage.write(NAMESPACE, FORCED_KEY, &[mode as u8]),
            None => storage.delete(NAMESPACE, FORCED_KEY),
        }
    }

    /// Load a previously persisted flag.  Missing or unreadable values
    /// leave the flag in automatic mode.
    pub fn restore(&self, storage: &impl StoragePort) -> OperationMode {
        let mut buf = [0u8; 16];
        let op = match storage.read(NAMESPACE, OPMODE_KEY, &mut buf) {
            Ok(n) => core::str::from_utf8(&buf[..n])
                .ok()
                .and_then(OperationMode::parse),
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("ModeFlag: opmode read failed: {}", e);
                None
            }
        };
        let Some(op) = op else {
            self.set(OperationMode::Automatic, None);
            return OperationMode::Automatic;
        };

        let mut byte = [0u8; 1];
        let forced = match storage.read(NAMESPACE, FORCED_KEY, &mut byte) {
            Ok(1) => CoolingMode::from_index(byte[0]),
            _ => None,
        };
        let forced = match op {
            OperationMode::Emergency => Some(CoolingMode::Emergency),
            _ => forced,
        };
        self.set(op, forced);
        info!(
            "ModeFlag: restored {} (forced={})",
            op,
            forced.map_or("none", CoolingMode::name)
        );
        op
    }
}

impl OperationModeSource for ModeFlag {
    fn current(&self) -> OperationMode {
        OperationMode::from_u8(self.operation.load(Ordering::SeqCst))
    }

    fn forced_mode(&self) -> Option<CoolingMode> {
        CoolingMode::from_index(self.forced.load(Ordering::SeqCst))
    }

    fn take_applied_override(&self) -> Option<CoolingMode> {
        CoolingMode::from_index(self.applied.swap(NO_FORCED_MODE, Ordering::SeqCst))
    }
}
