//! Persistent calibration store.
//!
//! Layout of the reserved [`ByteStore`] region:
//!
//! ```text
//!   byte 0        presence marker (== declared blob size when valid)
//!   bytes 1..=N   engine state blob, N = declared size
//! ```
//!
//! The marker is always written last, so an interrupted save never leaves a
//! blob that looks valid but is partially stale.

use log::{info, warn};

use crate::app::ports::{ByteStore, CalibrationBlob, GasEngine};
use crate::error::CalibrationError;

const MARKER_ADDR: usize = 0;
const BLOB_ADDR: usize = 1;

/// Outcome of [`CalibrationStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Blob read back and installed into the engine.
    Restored(CalibrationBlob),
    /// Marker mismatch; the region was zero-filled and committed.
    NoPriorState,
}

/// Owner of the calibration region.  Nothing else touches the store.
pub struct CalibrationStore<S: ByteStore> {
    store: S,
}

impl<S: ByteStore> CalibrationStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the persisted blob and install it into `engine`.
    ///
    /// On a marker mismatch the marker and every blob byte are zeroed and
    /// committed before returning [`LoadOutcome::NoPriorState`].  A zero-fill
    /// that fails part-way is reported as an error, never as success.
    pub fn load<E: GasEngine>(&mut self, engine: &mut E) -> Result<LoadOutcome, CalibrationError> {
        let size = engine.state_blob_size();
        self.check_capacity(size)?;

        let marker = self.store.read_byte(MARKER_ADDR)?;
        if marker != size {
            info!(
                "Calibration: marker {} != size {}, erasing {} bytes",
                marker,
                size,
                size as usize + 1
            );
            for addr in MARKER_ADDR..=size as usize {
                self.store.write_byte(addr, 0)?;
            }
            self.store.commit()?;
            return Ok(LoadOutcome::NoPriorState);
        }

        let mut blob = CalibrationBlob::new();
        for i in 0..size as usize {
            let byte = self.store.read_byte(BLOB_ADDR + i)?;
            // size <= 255 == capacity, push cannot fail
            let _ = blob.push(byte);
        }
        engine.set_state(&blob)?;
        info!("Calibration: restored {} byte state", size);
        Ok(LoadOutcome::Restored(blob))
    }

    /// Export the engine's state and persist it, marker last.
    ///
    /// The engine is queried before any byte is written; if that fails the
    /// store is left untouched.
    pub fn save<E: GasEngine>(&mut self, engine: &mut E) -> Result<(), CalibrationError> {
        let size = engine.state_blob_size();
        self.check_capacity(size)?;

        let mut blob = CalibrationBlob::new();
        engine.get_state(&mut blob)?;
        if blob.len() != size as usize {
            return Err(CalibrationError::SizeMismatch {
                declared: size,
                actual: blob.len(),
            });
        }

        for (i, byte) in blob.iter().enumerate() {
            self.store.write_byte(BLOB_ADDR + i, *byte)?;
        }
        self.store.write_byte(MARKER_ADDR, size)?;
        self.store.commit()?;
        info!("Calibration: saved {} byte state", size);
        Ok(())
    }

    /// Direct access to the backing store (diagnostics, tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    fn check_capacity(&self, size: u8) -> Result<(), CalibrationError> {
        if self.store.capacity() < size as usize + 1 {
            warn!(
                "Calibration: region of {} bytes cannot hold {} byte blob",
                self.store.capacity(),
                size
            );
            return Err(crate::error::StorageError::OutOfBounds.into());
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Save gate
// ═══════════════════════════════════════════════════════════════

/// Time gate for calibration write-back.
///
/// The first check after boot always passes; afterwards a save is due only
/// once `saves * period_ms < uptime_ms`.  The counter lives in RAM, so every
/// wake cycle starts fresh.
#[derive(Debug, Clone)]
pub struct SaveGate {
    period_ms: u64,
    saves: u32,
}

impl SaveGate {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            saves: 0,
        }
    }

    pub fn is_due(&self, uptime_ms: u64) -> bool {
        self.saves == 0 || u64::from(self.saves).saturating_mul(self.period_ms) < uptime_ms
    }

    /// Record a write-back attempt.
    pub fn mark_saved(&mut self) {
        self.saves = self.saves.saturating_add(1);
    }

    pub fn saves(&self) -> u32 {
        self.saves
    }
}
