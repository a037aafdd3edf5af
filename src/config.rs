//! Node configuration parameters
//!
//! All tunable parameters for the FireNode duty cycle.
//! Values can be overridden via NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)).

use serde::{Deserialize, Serialize};

use crate::engine::SampleRate;
use crate::telemetry::message::TelemetryFormat;

/// LoRa PHY parameters.  Applied once at boot; any rejected value is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioProfile {
    /// Carrier frequency in MHz.
    pub frequency_mhz: f32,
    /// Channel bandwidth in kHz.
    pub bandwidth_khz: f32,
    /// LoRa spreading factor (5–12).
    pub spreading_factor: u8,
    /// Coding rate denominator: 5 means 4/5.
    pub coding_rate: u8,
    /// Preamble length in symbols.
    pub preamble_len: u16,
    /// Transmit power in dBm.
    pub output_power_dbm: i8,
}

impl RadioProfile {
    /// EU 868 MHz profile.
    pub const fn eu868() -> Self {
        Self {
            frequency_mhz: 868.0,
            bandwidth_khz: 125.0,
            spreading_factor: 10,
            coding_rate: 5,
            preamble_len: 8,
            output_power_dbm: 14,
        }
    }

    /// Regional 865.1 MHz profile used by the ground receiver.
    pub const fn in865() -> Self {
        Self {
            frequency_mhz: 865.1,
            ..Self::eu868()
        }
    }
}

impl Default for RadioProfile {
    fn default() -> Self {
        Self::eu868()
    }
}

/// Bandwidths (kHz) accepted by the SX126x LoRa modem.
pub const LORA_BANDWIDTHS_KHZ: [f32; 10] =
    [7.8, 10.4, 15.6, 20.8, 31.25, 41.7, 62.5, 125.0, 250.0, 500.0];

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Decision ---
    /// Completed classification ticks to wait before trusting the output.
    pub warmup_ticks: u8,
    /// Class probability (percent) above which an alarm is raised.
    pub confidence_threshold_percent: f32,
    /// Engine acquisition schedule.
    pub sample_rate: SampleRate,

    // --- Calibration ---
    /// Minimum uptime between calibration write-backs (milliseconds).
    pub state_save_period_ms: u64,

    // --- Timing ---
    /// Wake timer armed at boot (seconds).
    pub boot_wake_timer_secs: u32,
    /// Pause between decision and sleep entry (milliseconds).
    pub pre_sleep_delay_ms: u32,
    /// Deep-sleep interval armed just before sleeping (seconds).
    pub deep_sleep_secs: u32,
    /// Longest the node may stay ACTIVE without a decision (seconds).
    pub max_active_secs: u32,

    // --- Telemetry ---
    /// Transmit one message per wake cycle.
    pub telemetry_enabled: bool,
    /// Payload layout.
    pub telemetry_format: TelemetryFormat,

    // --- Radio ---
    pub radio: RadioProfile,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Decision
            warmup_ticks: 2,
            confidence_threshold_percent: 70.0,
            sample_rate: SampleRate::Scan,

            // Calibration
            state_save_period_ms: 360 * 60 * 1000, // 4 times a day

            // Timing
            boot_wake_timer_secs: 2,
            pre_sleep_delay_ms: 2000,
            deep_sleep_secs: 1,
            max_active_secs: 30,

            // Telemetry
            telemetry_enabled: true,
            telemetry_format: TelemetryFormat::EnvironmentV1,

            // Radio
            radio: RadioProfile::eu868(),
        }
    }
}

impl NodeConfig {
    /// Parse a JSON override document (host tooling, bench provisioning).
    pub fn from_json(json: &str) -> Result<Self, crate::app::ports::ConfigError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|_| crate::app::ports::ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        Ok(cfg)
    }
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &NodeConfig) -> Result<(), crate::app::ports::ConfigError> {
    use crate::app::ports::ConfigError::ValidationFailed;

    if cfg.warmup_ticks == 0 {
        return Err(ValidationFailed("warmup_ticks must be >= 1"));
    }
    if !(0.0..=100.0).contains(&cfg.confidence_threshold_percent) {
        return Err(ValidationFailed(
            "confidence_threshold_percent must be 0.0–100.0",
        ));
    }
    if cfg.state_save_period_ms == 0 {
        return Err(ValidationFailed("state_save_period_ms must be > 0"));
    }
    if !(1..=3600).contains(&cfg.boot_wake_timer_secs) {
        return Err(ValidationFailed("boot_wake_timer_secs must be 1–3600"));
    }
    if !(1..=86_400).contains(&cfg.deep_sleep_secs) {
        return Err(ValidationFailed("deep_sleep_secs must be 1–86400"));
    }
    if cfg.pre_sleep_delay_ms > 30_000 {
        return Err(ValidationFailed("pre_sleep_delay_ms must be <= 30000"));
    }
    if !(1..=600).contains(&cfg.max_active_secs) {
        return Err(ValidationFailed("max_active_secs must be 1–600"));
    }
    validate_radio(&cfg.radio)
}

/// SX126x accepted parameter ranges.
pub fn validate_radio(p: &RadioProfile) -> Result<(), crate::app::ports::ConfigError> {
    use crate::app::ports::ConfigError::ValidationFailed;

    if !(150.0..=960.0).contains(&p.frequency_mhz) {
        return Err(ValidationFailed("frequency_mhz must be 150.0–960.0"));
    }
    if !LORA_BANDWIDTHS_KHZ
        .iter()
        .any(|bw| (bw - p.bandwidth_khz).abs() < 0.01)
    {
        return Err(ValidationFailed("bandwidth_khz is not a LoRa bandwidth"));
    }
    if !(5..=12).contains(&p.spreading_factor) {
        return Err(ValidationFailed("spreading_factor must be 5–12"));
    }
    if !(5..=8).contains(&p.coding_rate) {
        return Err(ValidationFailed("coding_rate must be 5–8"));
    }
    if !(-17..=22).contains(&p.output_power_dbm) {
        return Err(ValidationFailed("output_power_dbm must be -17–22"));
    }
    if p.preamble_len == 0 {
        return Err(ValidationFailed("preamble_len must be > 0"));
    }
    Ok(())
}
