//! Mock hardware for integration tests.
//!
//! Every fake records what it was asked to do so tests can assert on the
//! full call history without a sensor, a radio or flash.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use firenode::app::events::AppEvent;
use firenode::app::ports::{
    AlarmChannel, AlarmPort, ByteStore, CalibrationBlob, Clock, EventSink, GasEngine, RadioPort,
    SleepPort, WakeCause,
};
use firenode::engine::{Accuracy, OutputBatch, OutputSample, SampleRate, SignalId};
use firenode::error::{EngineError, RadioError, StorageError};
use firenode::telemetry::TxDoneFlag;

// ── Byte store ────────────────────────────────────────────────

pub const REGION_LEN: usize = 256;

/// RAM-backed byte region.  Clones share the same bytes, so a test can
/// hand one to a `DutyCycle` and keep another to inspect or reuse.
#[derive(Clone)]
pub struct MemStore {
    bytes: Rc<RefCell<Vec<u8>>>,
    commits: Rc<Cell<u32>>,
    writes: Rc<Cell<u32>>,
    /// Address whose write fails (every write at or after it, once hit).
    pub fail_write_at: Option<usize>,
    pub fail_commit: bool,
}

#[allow(dead_code)]
impl MemStore {
    /// Freshly erased flash: every byte reads 0xFF.
    pub fn erased() -> Self {
        Self::filled(0xFF)
    }

    pub fn filled(value: u8) -> Self {
        Self {
            bytes: Rc::new(RefCell::new(vec![value; REGION_LEN])),
            commits: Rc::new(Cell::new(0)),
            writes: Rc::new(Cell::new(0)),
            fail_write_at: None,
            fail_commit: false,
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    pub fn poke(&self, addr: usize, value: u8) {
        self.bytes.borrow_mut()[addr] = value;
    }

    pub fn commits(&self) -> u32 {
        self.commits.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

impl ByteStore for MemStore {
    fn capacity(&self) -> usize {
        REGION_LEN
    }

    fn read_byte(&self, addr: usize) -> Result<u8, StorageError> {
        self.bytes
            .borrow()
            .get(addr)
            .copied()
            .ok_or(StorageError::OutOfBounds)
    }

    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), StorageError> {
        if self.fail_write_at.is_some_and(|at| addr >= at) {
            return Err(StorageError::WriteFailed);
        }
        let mut bytes = self.bytes.borrow_mut();
        let slot = bytes.get_mut(addr).ok_or(StorageError::OutOfBounds)?;
        *slot = value;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_commit {
            return Err(StorageError::CommitFailed);
        }
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }
}

// ── Classification engine ─────────────────────────────────────

/// Scripted engine.  Every call is due; each `process` pops the next
/// scripted batch (empty once the script runs out).
pub struct FakeEngine {
    pub blob_size: u8,
    pub state: Vec<u8>,
    pub installed: Option<Vec<u8>>,
    pub fail_get_state: bool,
    pub reject_profile: bool,
    pub subscribed_rate: Option<SampleRate>,
    script: Vec<Vec<OutputSample>>,
    pub processed: u32,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new(blob_size: u8) -> Self {
        Self {
            blob_size,
            state: (0..blob_size).map(|i| i.wrapping_mul(7).wrapping_add(3)).collect(),
            installed: None,
            fail_get_state: false,
            reject_profile: false,
            subscribed_rate: None,
            script: Vec::new(),
            processed: 0,
        }
    }

    /// Queue `n` full batches carrying the given class probabilities.
    pub fn with_ticks(mut self, n: usize, fire: f32, air: f32) -> Self {
        for _ in 0..n {
            self.script.push(class_batch(fire, air));
        }
        self
    }

    pub fn push_batch(&mut self, batch: Vec<OutputSample>) {
        self.script.push(batch);
    }
}

/// Environment plus both class estimates, as the engine delivers them.
pub fn class_batch(fire: f32, air: f32) -> Vec<OutputSample> {
    vec![
        OutputSample::new(SignalId::RawTemperature, 23.5, 0),
        OutputSample::new(SignalId::RawPressure, 100_800.0, 0),
        OutputSample::new(SignalId::RawHumidity, 51.25, 0),
        OutputSample::new(SignalId::RawGas, 85_000.0, 0),
        OutputSample::new(SignalId::GasEstimate1, fire, 0).with_accuracy(Accuracy::High),
        OutputSample::new(SignalId::GasEstimate2, air, 0).with_accuracy(Accuracy::High),
    ]
}

impl GasEngine for FakeEngine {
    fn state_blob_size(&self) -> u8 {
        self.blob_size
    }

    fn set_configuration(&mut self, _profile: &[u8]) -> Result<(), EngineError> {
        if self.reject_profile {
            Err(EngineError::InvalidConfiguration)
        } else {
            Ok(())
        }
    }

    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError> {
        self.installed = Some(blob.to_vec());
        self.state = blob.to_vec();
        Ok(())
    }

    fn get_state(&mut self, out: &mut CalibrationBlob) -> Result<(), EngineError> {
        if self.fail_get_state {
            return Err(EngineError::StateUnavailable);
        }
        out.clear();
        out.extend_from_slice(&self.state)
            .map_err(|_| EngineError::StateUnavailable)
    }

    fn update_subscription(&mut self, _: &[SignalId], rate: SampleRate) -> Result<(), EngineError> {
        self.subscribed_rate = Some(rate);
        Ok(())
    }

    fn next_call_in_ms(&self, _now_ms: u64) -> u64 {
        0
    }

    fn process(&mut self, _now_ms: u64, out: &mut OutputBatch) -> Result<(), EngineError> {
        self.processed += 1;
        if !self.script.is_empty() {
            for s in self.script.remove(0) {
                out.push(s).map_err(|_| EngineError::Status(-1))?;
            }
        }
        Ok(())
    }
}

// ── Radio ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Begin,
    Frequency(f32),
    Bandwidth(f32),
    SpreadingFactor(u8),
    CodingRate(u8),
    OutputPower(i8),
    Preamble(u16),
    Start(Vec<u8>),
    Finish,
}

pub struct FakeRadio {
    pub calls: Vec<RadioCall>,
    pub reject_frequency: bool,
    pub fail_start: Option<RadioError>,
    done: TxDoneFlag,
}

#[allow(dead_code)]
impl FakeRadio {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            reject_frequency: false,
            fail_start: None,
            done: TxDoneFlag::new(),
        }
    }

    pub fn payloads(&self) -> Vec<&[u8]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Start(p) => Some(p.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl RadioPort for FakeRadio {
    fn begin(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Begin);
        Ok(())
    }

    fn set_frequency(&mut self, mhz: f32) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Frequency(mhz));
        if self.reject_frequency {
            return Err(RadioError::InvalidFrequency);
        }
        Ok(())
    }

    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Bandwidth(khz));
        Ok(())
    }

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SpreadingFactor(sf));
        Ok(())
    }

    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::CodingRate(denominator));
        Ok(())
    }

    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::OutputPower(dbm));
        Ok(())
    }

    fn set_preamble_length(&mut self, symbols: u16) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Preamble(symbols));
        Ok(())
    }

    fn start_transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Start(payload.to_vec()));
        if let Some(e) = self.fail_start {
            return Err(e);
        }
        self.done.signal();
        Ok(())
    }

    fn tx_done(&self) -> &TxDoneFlag {
        &self.done
    }

    fn finish_transmit(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Finish);
        Ok(())
    }
}

// ── Alarms ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingAlarms {
    pub calls: Vec<(AlarmChannel, bool)>,
}

#[allow(dead_code)]
impl RecordingAlarms {
    pub fn is_on(&self, channel: AlarmChannel) -> bool {
        self.calls
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .is_some_and(|(_, on)| *on)
    }
}

impl AlarmPort for RecordingAlarms {
    fn set_alarm(&mut self, channel: AlarmChannel, active: bool) {
        self.calls.push((channel, active));
    }
}

// ── Sleep ─────────────────────────────────────────────────────

pub struct FakeSleep {
    pub wake: WakeCause,
    pub armed: Vec<u32>,
    pub slept: bool,
}

impl FakeSleep {
    pub fn new(wake: WakeCause) -> Self {
        Self {
            wake,
            armed: Vec::new(),
            slept: false,
        }
    }
}

impl SleepPort for FakeSleep {
    fn wake_cause(&self) -> WakeCause {
        self.wake
    }

    fn arm_wake_timer(&mut self, secs: u32) {
        self.armed.push(secs);
    }

    fn deep_sleep(&mut self) {
        self.slept = true;
    }
}

// ── Clock / delay ─────────────────────────────────────────────

/// Advances by `step_ms` on every read.
pub struct FakeClock {
    now: Cell<u64>,
    step_ms: u64,
}

impl FakeClock {
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
            step_ms,
        }
    }
}

impl Clock for FakeClock {
    fn uptime_ms(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step_ms);
        t
    }
}

/// Records the total requested delay instead of sleeping.
#[derive(Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
