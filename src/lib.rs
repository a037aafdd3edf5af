//! FireNode firmware library.
//!
//! Exposes the duty-cycle core and its adapters for integration testing
//! and the firmware binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod scheduler;
pub mod telemetry;

pub mod adapters;
pub mod drivers;
