//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the boundary types for the FireNode duty cycle.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping the scheduler, aggregator and calibration store
//! fully testable without real peripherals.

pub mod events;
pub mod ports;
