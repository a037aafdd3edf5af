//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn pct(p: Option<f32>) -> f32 {
    p.map_or(f32::NAN, |v| v * 100.0)
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted { wake, calibration } => {
                info!("BOOT  | wake={:?} | calibration={:?}", wake, calibration);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::ClassTick {
                count,
                probabilities,
            } => {
                info!(
                    "CLASS | tick={} | fire={:.2}% air={:.2}% | accuracy={:?}",
                    count,
                    pct(probabilities.fire),
                    pct(probabilities.ambient_air),
                    probabilities.accuracy,
                );
            }
            AppEvent::AlarmDecision {
                fire,
                ambient_air,
                probabilities,
            } => {
                info!(
                    "ALARM | fire={} ({:.2}%) | air={} ({:.2}%)",
                    if *fire { "ON" } else { "off" },
                    pct(probabilities.fire),
                    if *ambient_air { "ON" } else { "off" },
                    pct(probabilities.ambient_air),
                );
            }
            AppEvent::CalibrationSaved { bytes } => {
                info!("STATE | calibration saved ({} bytes)", bytes);
            }
            AppEvent::CalibrationSaveFailed(e) => {
                warn!("STATE | calibration save failed: {}", e);
            }
            AppEvent::TelemetrySent { len } => {
                info!("RADIO | sent {} bytes", len);
            }
            AppEvent::TelemetryFailed(code) => {
                warn!("RADIO | failed, code {}", code);
            }
            AppEvent::ActiveTimeout { elapsed_ms } => {
                warn!("SLEEP | no decision after {} ms", elapsed_ms);
            }
            AppEvent::Sleeping { secs } => {
                info!("SLEEP | deep sleep for {} s", secs);
            }
        }
    }
}
