//! Actuator drivers and peripheral helpers.

pub mod motor;
pub mod shared;
pub mod watchdog;
