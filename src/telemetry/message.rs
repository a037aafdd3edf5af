//! Telemetry payload formats.
//!
//! The payload layout is versioned and selected by configuration:
//!
//! | Format          | Example                           |
//! |-----------------|-----------------------------------|
//! | `EnvironmentV1` | `21.50 101325.00 45.00`           |
//! | `FramedV2`      | `DATA 21.50 45.00 85.00 ENDATA`   |
//! | `Fixed`         | `DINGDONG`                        |

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use super::MAX_PAYLOAD_LEN;
use crate::error::TelemetryError;
use crate::fsm::{ClassProbabilities, LatestReadings};

/// Longest fixed alert string.
pub const MAX_FIXED_LEN: usize = 32;

/// One formatted radio payload.
pub type Message = heapless::String<MAX_PAYLOAD_LEN>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryFormat {
    /// Temperature (°C), pressure (Pa), humidity (%RH); space separated.
    EnvironmentV1,
    /// `DATA <t> <h> <fire%> ENDATA` for the ground-station receiver.
    FramedV2,
    /// A fixed alert string.
    Fixed(heapless::String<MAX_FIXED_LEN>),
}

impl TelemetryFormat {
    /// Fixed-string format; `None` if `text` is longer than [`MAX_FIXED_LEN`].
    pub fn fixed(text: &str) -> Option<Self> {
        let mut s = heapless::String::new();
        s.push_str(text).ok()?;
        Some(Self::Fixed(s))
    }
}

/// Render one payload from the cycle's latest values.
pub fn build_message(
    format: &TelemetryFormat,
    readings: &LatestReadings,
    probabilities: &ClassProbabilities,
) -> Result<Message, TelemetryError> {
    let mut msg = Message::new();
    match format {
        TelemetryFormat::EnvironmentV1 => {
            let fields = [
                readings.temperature_c,
                readings.pressure_pa,
                readings.humidity_percent,
            ];
            if fields.iter().all(Option::is_none) {
                return Err(TelemetryError::MissingReading("environment"));
            }
            for value in fields.into_iter().flatten() {
                if !msg.is_empty() {
                    push(&mut msg, " ")?;
                }
                write!(msg, "{:.2}", value).map_err(|_| TelemetryError::MessageTooLong)?;
            }
        }
        TelemetryFormat::FramedV2 => {
            let t = readings
                .temperature_c
                .ok_or(TelemetryError::MissingReading("temperature"))?;
            let h = readings
                .humidity_percent
                .ok_or(TelemetryError::MissingReading("humidity"))?;
            let fire = probabilities
                .fire_percent()
                .ok_or(TelemetryError::MissingReading("fire probability"))?;
            write!(msg, "DATA {:.2} {:.2} {:.2} ENDATA", t, h, fire)
                .map_err(|_| TelemetryError::MessageTooLong)?;
        }
        TelemetryFormat::Fixed(text) => push(&mut msg, text)?,
    }
    Ok(msg)
}

fn push(msg: &mut Message, s: &str) -> Result<(), TelemetryError> {
    msg.push_str(s).map_err(|_| TelemetryError::MessageTooLong)
}
