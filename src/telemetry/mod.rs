//! Telemetry relay: one best-effort LoRa packet per wake cycle.
//!
//! ```text
//!   configure(profile)          once at boot, any rejection is fatal
//!   send(payload)
//!     ├─ start_transmit ──▶ DIO1 ISR ──▶ TxDoneFlag
//!     ├─ spin on TxDoneFlag
//!     └─ finish_transmit         always, success or failure
//! ```
//!
//! No addressing, acknowledgement, retry or encryption.

pub mod frame;
pub mod message;

use core::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::app::ports::RadioPort;
use crate::config::RadioProfile;
use crate::error::RadioError;

/// Largest payload the relay accepts.
pub const MAX_PAYLOAD_LEN: usize = 256;

// ───────────────────────────────────────────────────────────────
// Transmit-complete flag
// ───────────────────────────────────────────────────────────────

/// Single-writer (ISR) / single-reader (main loop) completion flag.
#[derive(Debug, Default)]
pub struct TxDoneFlag(AtomicBool);

impl TxDoneFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag.  Lock-free, safe from interrupt context.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Flag wired to the SX1262 DIO1 interrupt on hardware.
pub static RADIO_TX_DONE: TxDoneFlag = TxDoneFlag::new();

/// Called from the DIO1 GPIO ISR.
pub fn signal_tx_done_from_isr() {
    RADIO_TX_DONE.signal();
}

// ───────────────────────────────────────────────────────────────
// Relay
// ───────────────────────────────────────────────────────────────

/// Sole owner of the radio for the wake cycle.
pub struct TelemetryRelay<R: RadioPort> {
    radio: R,
    sent: bool,
}

impl<R: RadioPort> TelemetryRelay<R> {
    pub fn new(radio: R) -> Self {
        Self { radio, sent: false }
    }

    /// Bring the chip up and apply every PHY parameter.  The first rejection
    /// is returned; the caller treats it as fatal.
    pub fn configure(&mut self, profile: &RadioProfile) -> Result<(), RadioError> {
        info!("Radio: initializing ...");
        self.radio.begin().inspect_err(|e| report("begin", *e))?;
        self.radio
            .set_frequency(profile.frequency_mhz)
            .inspect_err(|e| report("frequency", *e))?;
        self.radio
            .set_bandwidth(profile.bandwidth_khz)
            .inspect_err(|e| report("bandwidth", *e))?;
        self.radio
            .set_spreading_factor(profile.spreading_factor)
            .inspect_err(|e| report("spreading factor", *e))?;
        self.radio
            .set_coding_rate(profile.coding_rate)
            .inspect_err(|e| report("coding rate", *e))?;
        self.radio
            .set_output_power(profile.output_power_dbm)
            .inspect_err(|e| report("output power", *e))?;
        self.radio
            .set_preamble_length(profile.preamble_len)
            .inspect_err(|e| report("preamble length", *e))?;
        info!(
            "Radio: {:.1} MHz BW {:.1} kHz SF{} CR4/{} {} dBm preamble {}",
            profile.frequency_mhz,
            profile.bandwidth_khz,
            profile.spreading_factor,
            profile.coding_rate,
            profile.output_power_dbm,
            profile.preamble_len
        );
        Ok(())
    }

    /// Transmit `payload` and block until the radio reports completion.
    ///
    /// At most one attempt per wake cycle; a second call returns
    /// [`RadioError::AlreadySent`] without touching the radio.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if self.sent {
            return Err(RadioError::AlreadySent);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            warn!("Radio: payload of {} bytes rejected", payload.len());
            return Err(RadioError::PacketTooLong);
        }
        self.sent = true;

        info!("Radio: sending {} bytes", payload.len());
        self.radio.tx_done().clear();
        let outcome = self.radio.start_transmit(payload);
        if outcome.is_ok() {
            // No timeout: a stuck radio holds the cycle until the wake timer.
            while !self.radio.tx_done().take() {
                core::hint::spin_loop();
            }
        }

        match outcome {
            Ok(()) => info!("Radio: transmission finished!"),
            Err(e) => warn!("Radio: failed, code {}", e.code()),
        }

        if let Err(e) = self.radio.finish_transmit() {
            warn!("Radio: cleanup failed, code {}", e.code());
        }
        outcome
    }

    /// Whether a transmission was attempted this cycle.
    pub fn has_sent(&self) -> bool {
        self.sent
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }
}

fn report(what: &str, e: RadioError) {
    warn!("Radio: {} rejected, code {}", what, e.code());
}
