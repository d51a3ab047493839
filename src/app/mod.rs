//! Application core: pure drive logic, zero I/O.
//!
//! Command interpretation, the control loop and the event types live here.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
