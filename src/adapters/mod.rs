//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                 |
//! |------------|---------------------|-----------------------------|
//! | `log_sink` | EventSink           | Serial log output           |
//! | `nvs`      | ByteStore           | NVS calibration region      |
//! |            | ConfigPort          | NVS / in-memory store       |
//! | `sim`      | GasEngine           | Replayed classification     |
//! |            | RadioPort           | Logged LoRa transmit (host) |
//! | `sleep`    | SleepPort           | ESP32 RTC deep sleep        |
//! | `time`     | Clock, DelayNs      | ESP32 system timer          |

pub mod log_sink;
pub mod nvs;
#[cfg(any(feature = "sim", not(target_os = "espidf")))]
pub mod sim;
pub mod sleep;
pub mod time;
