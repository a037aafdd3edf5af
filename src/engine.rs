//! Classification engine adapter.
//!
//! Wraps a [`GasEngine`] (the opaque vendor sensor-fusion library) behind
//! four operations: `configure`, `subscribe`, `tick` and the
//! [`OutputDelegate`] callback.  `tick` is cheap to call in a tight loop;
//! when no acquisition is due it returns without side effects.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{GasEngine, OutputDelegate};
use crate::error::EngineError;

/// Maximum outputs in one batch (the full subscription catalogue).
pub const MAX_OUTPUTS: usize = 16;

/// One batch of engine outputs for a single tick.
pub type OutputBatch = heapless::Vec<OutputSample, MAX_OUTPUTS>;

// ---------------------------------------------------------------------------
// Signal catalogue
// ---------------------------------------------------------------------------

/// Virtual sensor outputs the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
    RawTemperature,
    RawPressure,
    RawHumidity,
    /// Gas resistance in ohms.
    RawGas,
    RawGasIndex,
    HeatCompensatedTemperature,
    HeatCompensatedHumidity,
    /// Fire class probability (0–1).
    GasEstimate1,
    /// Ambient-air class probability (0–1).
    GasEstimate2,
    GasEstimate3,
    GasEstimate4,
}

/// Signals the node subscribes to.
pub const DEFAULT_SUBSCRIPTION: [SignalId; 11] = [
    SignalId::RawTemperature,
    SignalId::RawPressure,
    SignalId::RawHumidity,
    SignalId::RawGas,
    SignalId::RawGasIndex,
    SignalId::HeatCompensatedTemperature,
    SignalId::HeatCompensatedHumidity,
    SignalId::GasEstimate1,
    SignalId::GasEstimate2,
    SignalId::GasEstimate3,
    SignalId::GasEstimate4,
];

/// Classification accuracy, shared by all gas estimates in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Accuracy {
    Unreliable = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Accuracy {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Unreliable),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }
}

/// Acquisition schedule class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    /// Gas-scan mode, one heater profile every 10.8 s.
    Scan,
    Continuous,
    LowPower,
    UltraLowPower,
}

impl SampleRate {
    pub const fn period_ms(self) -> u64 {
        match self {
            Self::Scan => 10_800,
            Self::Continuous => 1_000,
            Self::LowPower => 3_000,
            Self::UltraLowPower => 300_000,
        }
    }
}

/// One named signal from a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSample {
    pub id: SignalId,
    pub value: f32,
    pub accuracy: Option<Accuracy>,
    /// Engine timestamp (nanoseconds since boot).
    pub timestamp_ns: u64,
}

impl OutputSample {
    pub fn new(id: SignalId, value: f32, timestamp_ns: u64) -> Self {
        Self {
            id,
            value,
            accuracy: None,
            timestamp_ns,
        }
    }

    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Owns the engine for the lifetime of the wake cycle.
pub struct EngineAdapter<E: GasEngine> {
    engine: E,
    subscribed: bool,
    batches: u32,
}

impl<E: GasEngine> EngineAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            subscribed: false,
            batches: 0,
        }
    }

    /// Install a classification profile.
    pub fn configure(&mut self, profile: &[u8]) -> Result<(), EngineError> {
        self.engine.set_configuration(profile).inspect_err(|e| {
            warn!("Engine: configuration rejected ({})", e);
        })?;
        info!("Engine: profile installed ({} bytes)", profile.len());
        Ok(())
    }

    /// Declare the outputs wanted and their sample rate.
    pub fn subscribe(&mut self, signals: &[SignalId], rate: SampleRate) -> Result<(), EngineError> {
        self.engine.update_subscription(signals, rate).inspect_err(|e| {
            warn!("Engine: subscription rejected ({})", e);
        })?;
        self.subscribed = true;
        info!(
            "Engine: subscribed to {} outputs at {:?} ({} ms)",
            signals.len(),
            rate,
            rate.period_ms()
        );
        Ok(())
    }

    /// Run the engine if an acquisition is due and hand the batch to
    /// `delegate`.  Returns `Ok(true)` when a batch was delivered.
    pub fn tick(
        &mut self,
        now_ms: u64,
        delegate: &mut dyn OutputDelegate,
    ) -> Result<bool, EngineError> {
        if !self.subscribed || self.engine.next_call_in_ms(now_ms) > 0 {
            return Ok(false);
        }

        let mut batch = OutputBatch::new();
        self.engine.process(now_ms, &mut batch)?;
        self.batches = self.batches.saturating_add(1);
        delegate.on_outputs(&batch);
        Ok(true)
    }

    /// Batches delivered so far this cycle.
    pub fn batches(&self) -> u32 {
        self.batches
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access for the calibration store.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
