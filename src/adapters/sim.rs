//! Simulated classification engine and radio.
//!
//! Stand-ins for the vendor gas-classification library and the SX1262.
//! The binary links [`SimEngine`] only when built with the `sim` feature;
//! [`SimRadio`] is for host runs and tests that drive a whole wake cycle.

use log::info;

use crate::app::ports::{CalibrationBlob, GasEngine, RadioPort};
use crate::config::LORA_BANDWIDTHS_KHZ;
use crate::engine::{Accuracy, OutputBatch, OutputSample, SampleRate, SignalId};
use crate::error::{EngineError, RadioError};
use crate::telemetry::{MAX_PAYLOAD_LEN, TxDoneFlag};

/// State blob size of the vendor engine.
pub const SIM_STATE_BLOB_SIZE: u8 = 221;

// ═══════════════════════════════════════════════════════════════
//  Engine
// ═══════════════════════════════════════════════════════════════

/// Replays a fixed environment and class probabilities on schedule.
pub struct SimEngine {
    fire: f32,
    air: f32,
    temperature_c: f32,
    pressure_pa: f32,
    humidity_percent: f32,
    gas_ohm: f32,

    state: [u8; SIM_STATE_BLOB_SIZE as usize],
    subscription: heapless::Vec<SignalId, 16>,
    period_ms: u64,
    next_ms: u64,
    configured: bool,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::with_probabilities(0.05, 0.95)
    }

    pub fn with_probabilities(fire: f32, air: f32) -> Self {
        Self {
            fire,
            air,
            temperature_c: 24.0,
            pressure_pa: 101_325.0,
            humidity_percent: 40.0,
            gas_ohm: 120_000.0,
            state: [0; SIM_STATE_BLOB_SIZE as usize],
            subscription: heapless::Vec::new(),
            period_ms: SampleRate::Scan.period_ms(),
            next_ms: 0,
            configured: false,
        }
    }

    /// Override the replayed environment.
    pub fn with_environment(mut self, temperature_c: f32, pressure_pa: f32, humidity_percent: f32) -> Self {
        self.temperature_c = temperature_c;
        self.pressure_pa = pressure_pa;
        self.humidity_percent = humidity_percent;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Current internal state (what `get_state` would export).
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    fn value_for(&self, id: SignalId) -> f32 {
        match id {
            SignalId::RawTemperature | SignalId::HeatCompensatedTemperature => self.temperature_c,
            SignalId::RawPressure => self.pressure_pa,
            SignalId::RawHumidity | SignalId::HeatCompensatedHumidity => self.humidity_percent,
            SignalId::RawGas => self.gas_ohm,
            SignalId::RawGasIndex => 0.0,
            SignalId::GasEstimate1 => self.fire,
            SignalId::GasEstimate2 => self.air,
            SignalId::GasEstimate3 | SignalId::GasEstimate4 => 0.0,
        }
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GasEngine for SimEngine {
    fn state_blob_size(&self) -> u8 {
        SIM_STATE_BLOB_SIZE
    }

    fn set_configuration(&mut self, profile: &[u8]) -> Result<(), EngineError> {
        if profile.is_empty() {
            return Err(EngineError::InvalidConfiguration);
        }
        self.configured = true;
        Ok(())
    }

    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        if blob.len() != self.state.len() {
            return Err(EngineError::StateRejected);
        }
        self.state.copy_from_slice(blob);
        Ok(())
    }

    fn get_state(&mut self, out: &mut CalibrationBlob) -> Result<(), EngineError> {
        out.clear();
        out.extend_from_slice(&self.state)
            .map_err(|_| EngineError::StateUnavailable)
    }

    fn update_subscription(&mut self, signals: &[SignalId], rate: SampleRate) -> Result<(), EngineError> {
        self.subscription.clear();
        for s in signals {
            self.subscription
                .push(*s)
                .map_err(|_| EngineError::InvalidSubscription)?;
        }
        self.period_ms = rate.period_ms();
        Ok(())
    }

    fn next_call_in_ms(&self, now_ms: u64) -> u64 {
        self.next_ms.saturating_sub(now_ms)
    }

    fn process(&mut self, now_ms: u64, out: &mut OutputBatch) -> Result<(), EngineError> {
        self.next_ms = now_ms + self.period_ms;
        // Learned-baseline stand-in: every pass changes the state.
        self.state[0] = self.state[0].wrapping_add(1);

        let ts = now_ms * 1_000_000;
        for id in &self.subscription {
            let mut sample = OutputSample::new(*id, self.value_for(*id), ts);
            if matches!(
                id,
                SignalId::GasEstimate1
                    | SignalId::GasEstimate2
                    | SignalId::GasEstimate3
                    | SignalId::GasEstimate4
            ) {
                sample = sample.with_accuracy(Accuracy::High);
            }
            out.push(sample).map_err(|_| EngineError::Status(-1))?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Radio
// ═══════════════════════════════════════════════════════════════

/// SX126x stand-in: validates PHY parameters, "transmits" by logging and
/// raising the completion flag immediately.
pub struct SimRadio {
    done: TxDoneFlag,
    started: bool,
    transmitting: bool,
    last_payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
    tx_count: u32,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            done: TxDoneFlag::new(),
            started: false,
            transmitting: false,
            last_payload: heapless::Vec::new(),
            tx_count: 0,
        }
    }

    pub fn last_payload(&self) -> &[u8] {
        &self.last_payload
    }

    pub fn tx_count(&self) -> u32 {
        self.tx_count
    }

    /// True while the PA is up (between start and finish).
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    fn require_started(&self) -> Result<(), RadioError> {
        if self.started {
            Ok(())
        } else {
            Err(RadioError::ChipNotFound)
        }
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioPort for SimRadio {
    fn begin(&mut self) -> Result<(), RadioError> {
        self.started = true;
        Ok(())
    }

    fn set_frequency(&mut self, mhz: f32) -> Result<(), RadioError> {
        self.require_started()?;
        if !(150.0..=960.0).contains(&mhz) {
            return Err(RadioError::InvalidFrequency);
        }
        Ok(())
    }

    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError> {
        self.require_started()?;
        if !LORA_BANDWIDTHS_KHZ.iter().any(|bw| (bw - khz).abs() < 0.01) {
            return Err(RadioError::InvalidBandwidth);
        }
        Ok(())
    }

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(5..=12).contains(&sf) {
            return Err(RadioError::InvalidSpreadingFactor);
        }
        Ok(())
    }

    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(5..=8).contains(&denominator) {
            return Err(RadioError::InvalidCodingRate);
        }
        Ok(())
    }

    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError> {
        self.require_started()?;
        if !(-17..=22).contains(&dbm) {
            return Err(RadioError::InvalidOutputPower);
        }
        Ok(())
    }

    fn set_preamble_length(&mut self, symbols: u16) -> Result<(), RadioError> {
        self.require_started()?;
        if symbols == 0 {
            return Err(RadioError::InvalidPreambleLength);
        }
        Ok(())
    }

    fn start_transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.require_started()?;
        self.last_payload.clear();
        self.last_payload
            .extend_from_slice(payload)
            .map_err(|_| RadioError::PacketTooLong)?;
        self.transmitting = true;
        self.tx_count += 1;
        info!(
            "SimRadio: TX {:?}",
            core::str::from_utf8(payload).unwrap_or("<binary>")
        );
        self.done.signal();
        Ok(())
    }

    fn tx_done(&self) -> &TxDoneFlag {
        &self.done
    }

    fn finish_transmit(&mut self) -> Result<(), RadioError> {
        self.transmitting = false;
        Ok(())
    }
}
