//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration for the EnviroZen controller:
//! the per-tick control service, the operation-mode flag, override
//! commands and outbound events.  All interaction with hardware and the
//! network happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod mode_flag;
pub mod ports;
pub mod service;
