//! Per-tick views derived from the engine's output batches.
//!
//! `LatestReadings` holds the most recent environmental values (used by the
//! telemetry relay); `ClassProbabilities` is the pair of class estimates from
//! one tick plus their shared accuracy.

use crate::engine::{Accuracy, OutputSample, SignalId};

// ---------------------------------------------------------------------------
// Class probabilities
// ---------------------------------------------------------------------------

/// Fire / ambient-air estimates from a single classification tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassProbabilities {
    /// Fire class probability (0–1).
    pub fire: Option<f32>,
    /// Ambient-air class probability (0–1).
    pub ambient_air: Option<f32>,
    /// Reported once per tick for all classes.
    pub accuracy: Option<Accuracy>,
}

impl ClassProbabilities {
    pub fn fire_percent(&self) -> Option<f32> {
        self.fire.map(|p| p * 100.0)
    }

    pub fn ambient_air_percent(&self) -> Option<f32> {
        self.ambient_air.map(|p| p * 100.0)
    }

    /// Pull the class estimates out of one batch.
    pub fn from_batch(outputs: &[OutputSample]) -> Self {
        let mut probs = Self::default();
        for s in outputs {
            match s.id {
                SignalId::GasEstimate1 => {
                    probs.fire = Some(s.value);
                    probs.accuracy = probs.accuracy.or(s.accuracy);
                }
                SignalId::GasEstimate2 => {
                    probs.ambient_air = Some(s.value);
                    probs.accuracy = probs.accuracy.or(s.accuracy);
                }
                _ => {}
            }
        }
        probs
    }
}

// ---------------------------------------------------------------------------
// Environmental readings
// ---------------------------------------------------------------------------

/// Most recent raw environment values seen this wake cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatestReadings {
    /// °C
    pub temperature_c: Option<f32>,
    /// Pa, as the engine reports it
    pub pressure_pa: Option<f32>,
    /// %RH
    pub humidity_percent: Option<f32>,
    /// Ω
    pub gas_resistance_ohm: Option<f32>,
}

impl LatestReadings {
    /// Fold a batch into the latest values.  Heat-compensated readings win
    /// over raw ones when both are present.
    pub fn update(&mut self, outputs: &[OutputSample]) {
        let mut compensated_t = false;
        let mut compensated_h = false;
        for s in outputs {
            match s.id {
                SignalId::RawTemperature if !compensated_t => self.temperature_c = Some(s.value),
                SignalId::HeatCompensatedTemperature => {
                    self.temperature_c = Some(s.value);
                    compensated_t = true;
                }
                SignalId::RawPressure => self.pressure_pa = Some(s.value),
                SignalId::RawHumidity if !compensated_h => self.humidity_percent = Some(s.value),
                SignalId::HeatCompensatedHumidity => {
                    self.humidity_percent = Some(s.value);
                    compensated_h = true;
                }
                SignalId::RawGas => self.gas_resistance_ohm = Some(s.value),
                _ => {}
            }
        }
    }
}
