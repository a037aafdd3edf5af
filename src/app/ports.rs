//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DutyCycle (domain)
//! ```
//!
//! Driven adapters (storage, classification engine, radio, alarms, sleep,
//! event sinks) implement these traits.  The
//! [`DutyCycle`](crate::scheduler::DutyCycle) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **ByteStore** writes are not durable until [`ByteStore::commit`].
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::NodeConfig;
use crate::engine::{OutputBatch, OutputSample, SampleRate, SignalId};
use crate::error::{EngineError, RadioError, StorageError};
use crate::telemetry::TxDoneFlag;

// ───────────────────────────────────────────────────────────────
// Byte store (driven adapter: domain ↔ EEPROM-style flash region)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile region with explicit commit.
///
/// Writes land in a shadow buffer; `commit` flushes the whole region.
pub trait ByteStore {
    /// Size of the reserved region in bytes.
    fn capacity(&self) -> usize;

    fn read_byte(&self, addr: usize) -> Result<u8, StorageError>;

    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), StorageError>;

    /// Flush pending writes to flash.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Classification engine (driven adapter: vendor library → domain)
// ───────────────────────────────────────────────────────────────

/// Opaque engine state, at most 255 bytes (the size must fit the marker byte).
pub type CalibrationBlob = heapless::Vec<u8, 255>;

/// Capability set of the external gas-classification engine.
pub trait GasEngine {
    /// Declared size of the engine's state blob in bytes.
    fn state_blob_size(&self) -> u8;

    /// Install a selectivity / classification profile.
    fn set_configuration(&mut self, profile: &[u8]) -> Result<(), EngineError>;

    /// Install a previously exported state blob.
    fn set_state(&mut self, blob: &[u8]) -> Result<(), EngineError>;

    /// Export the current state blob into `out` (cleared first).
    fn get_state(&mut self, out: &mut CalibrationBlob) -> Result<(), EngineError>;

    /// Declare the output signals wanted and their sample rate.
    fn update_subscription(
        &mut self,
        signals: &[SignalId],
        rate: SampleRate,
    ) -> Result<(), EngineError>;

    /// Milliseconds until the next acquisition is due (0 = due now).
    fn next_call_in_ms(&self, now_ms: u64) -> u64;

    /// Run one acquisition / classification pass, appending outputs to `out`.
    fn process(&mut self, now_ms: u64, out: &mut OutputBatch) -> Result<(), EngineError>;
}

/// Receives every batch the engine produces.
pub trait OutputDelegate {
    fn on_outputs(&mut self, outputs: &[OutputSample]);
}

// ───────────────────────────────────────────────────────────────
// Radio (driven adapter: domain → LoRa transceiver)
// ───────────────────────────────────────────────────────────────

/// LoRa transceiver driver.  Every setter maps onto a driver status code.
pub trait RadioPort {
    /// Reset and identify the chip.
    fn begin(&mut self) -> Result<(), RadioError>;

    fn set_frequency(&mut self, mhz: f32) -> Result<(), RadioError>;

    fn set_bandwidth(&mut self, khz: f32) -> Result<(), RadioError>;

    fn set_spreading_factor(&mut self, sf: u8) -> Result<(), RadioError>;

    /// `denominator` 5–8 selects coding rate 4/5 – 4/8.
    fn set_coding_rate(&mut self, denominator: u8) -> Result<(), RadioError>;

    fn set_output_power(&mut self, dbm: i8) -> Result<(), RadioError>;

    fn set_preamble_length(&mut self, symbols: u16) -> Result<(), RadioError>;

    /// Start a non-blocking transmit.  Completion raises [`RadioPort::tx_done`].
    fn start_transmit(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Flag raised from the DIO1 transmit-complete interrupt.
    fn tx_done(&self) -> &TxDoneFlag;

    /// Clean up after a transmission and drop the PA to standby.
    fn finish_transmit(&mut self) -> Result<(), RadioError>;
}

// ───────────────────────────────────────────────────────────────
// Alarm port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Physical alarm indicator channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmChannel {
    Fire,
    AmbientAir,
}

/// Write-side port: set an alarm output level.
pub trait AlarmPort {
    fn set_alarm(&mut self, channel: AlarmChannel, active: bool);
}

// ───────────────────────────────────────────────────────────────
// Sleep / wake (driven adapter: domain → RTC controller)
// ───────────────────────────────────────────────────────────────

/// Why the processor started this wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Cold boot or reset (no sleep wake source).
    PowerOn,
    Timer,
    /// External pin (ext0/ext1).
    External,
    Other,
}

pub trait SleepPort {
    fn wake_cause(&self) -> WakeCause;

    /// Arm the RTC timer wake source.
    fn arm_wake_timer(&mut self, secs: u32);

    /// Enter deep sleep.  Does not return on hardware.
    fn deep_sleep(&mut self);
}

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
