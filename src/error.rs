//! Error types for the FireNode firmware.
//!
//! Each subsystem has its own small `Copy` error enum.  Most failures are
//! absorbed where they happen (logged, reported as an event, or folded into
//! a degraded mode); only the ones that stop the wake cycle reach the
//! top-level [`Error`].

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Failures that end the wake cycle early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The radio rejected a PHY parameter at boot.
    Radio(RadioError),
    /// A phase operation was called out of order.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Address lies outside the reserved region.
    OutOfBounds,
    /// A byte write was not accepted by the backend.
    WriteFailed,
    /// Flushing the shadow buffer to flash failed.
    CommitFailed,
    /// The backend could not be opened or read.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "address out of bounds"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::CommitFailed => write!(f, "commit failed"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The selectivity profile was rejected.
    InvalidConfiguration,
    /// The output subscription was rejected.
    InvalidSubscription,
    /// A persisted state blob was rejected on install.
    StateRejected,
    /// The engine could not export its state.
    StateUnavailable,
    /// Any other vendor status code.
    Status(i32),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration => write!(f, "configuration rejected"),
            Self::InvalidSubscription => write!(f, "subscription rejected"),
            Self::StateRejected => write!(f, "state blob rejected"),
            Self::StateUnavailable => write!(f, "state blob unavailable"),
            Self::Status(code) => write!(f, "status {code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

/// Radio failures.  Parameter variants mirror the SX126x driver's status
/// codes so the diagnostic stream can print the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The transceiver did not answer during bring-up.
    ChipNotFound,
    InvalidFrequency,
    InvalidBandwidth,
    InvalidSpreadingFactor,
    InvalidCodingRate,
    InvalidOutputPower,
    InvalidPreambleLength,
    /// Payload exceeds [`MAX_PAYLOAD_LEN`](crate::telemetry::MAX_PAYLOAD_LEN).
    PacketTooLong,
    /// A transmission was already attempted during this wake cycle.
    AlreadySent,
    /// Any other driver status code.
    Driver(i16),
}

impl RadioError {
    /// Signed driver status code.
    pub const fn code(self) -> i16 {
        match self {
            Self::ChipNotFound => -2,
            Self::PacketTooLong => -4,
            Self::InvalidBandwidth => -8,
            Self::InvalidSpreadingFactor => -9,
            Self::InvalidCodingRate => -10,
            Self::InvalidFrequency => -12,
            Self::InvalidOutputPower => -13,
            Self::InvalidPreambleLength => -18,
            Self::AlreadySent => -1000,
            Self::Driver(code) => code,
        }
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipNotFound => write!(f, "chip not found"),
            Self::InvalidFrequency => write!(f, "invalid frequency"),
            Self::InvalidBandwidth => write!(f, "invalid bandwidth"),
            Self::InvalidSpreadingFactor => write!(f, "invalid spreading factor"),
            Self::InvalidCodingRate => write!(f, "invalid coding rate"),
            Self::InvalidOutputPower => write!(f, "invalid output power"),
            Self::InvalidPreambleLength => write!(f, "invalid preamble length"),
            Self::PacketTooLong => write!(f, "packet too long"),
            Self::AlreadySent => write!(f, "already transmitted this cycle"),
            Self::Driver(code) => write!(f, "driver code {code}"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The byte store failed.
    Storage(StorageError),
    /// The engine refused to export or install its state.
    Engine(EngineError),
    /// The engine's blob does not match the declared size.
    SizeMismatch { declared: u8, actual: usize },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::SizeMismatch { declared, actual } => {
                write!(f, "blob size {actual} != declared {declared}")
            }
        }
    }
}

impl From<StorageError> for CalibrationError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<EngineError> for CalibrationError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The formatted message does not fit in one radio packet.
    MessageTooLong,
    /// The selected format needs a reading that is not available yet.
    MissingReading(&'static str),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooLong => write!(f, "message too long"),
            Self::MissingReading(name) => write!(f, "missing reading: {name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
