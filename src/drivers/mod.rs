//! Alarm drivers, the LoRa transceiver, hardware initialisation, and GPIO
//! helpers.

pub mod alarm;
pub mod gpio;
pub mod hw_init;
pub mod sx1262;
