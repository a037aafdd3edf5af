//! Outbound application events.
//!
//! The [`DutyCycle`](crate::scheduler::DutyCycle) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use super::ports::WakeCause;
use crate::fsm::ClassProbabilities;
use crate::scheduler::Phase;

/// Result of the boot-time calibration load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// A persisted blob was installed into the engine.
    Restored,
    /// Storage was uninitialised and has been zero-filled.
    FactoryDefaults,
    /// Storage failed; persistence is disabled for this cycle.
    Degraded,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Boot sequence finished.
    Booted {
        wake: WakeCause,
        calibration: CalibrationStatus,
    },

    /// The scheduler moved between phases.
    PhaseChanged { from: Phase, to: Phase },

    /// A classification tick completed.
    ClassTick {
        count: u8,
        probabilities: ClassProbabilities,
    },

    /// The aggregator decided; carries which alarms were asserted.
    AlarmDecision {
        fire: bool,
        ambient_air: bool,
        probabilities: ClassProbabilities,
    },

    /// Calibration blob written back.
    CalibrationSaved { bytes: u8 },

    /// Calibration write-back failed; carries the rendered cause.
    CalibrationSaveFailed(crate::error::CalibrationError),

    /// Telemetry packet transmitted.
    TelemetrySent { len: usize },

    /// Telemetry transmission failed with a driver code.
    TelemetryFailed(i16),

    /// ACTIVE ran out of time before a decision.
    ActiveTimeout { elapsed_ms: u64 },

    /// About to enter deep sleep.
    Sleeping { secs: u32 },
}
