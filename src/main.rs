//! FireNode Firmware: Main Entry Point
//!
//! One wake cycle per process instance; deep sleep ends it and the next
//! cycle starts from reset.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter        LogEventSink   SleepAdapter   Esp32Time     │
//! │  (ByteStore+Cfg)   (EventSink)    (SleepPort)    (Clock)       │
//! │  SimEngine         Sx1262         AlarmOutputs<GpioOutput>     │
//! │  (GasEngine)       (RadioPort)    (AlarmPort)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              DutyCycle (pure logic)                    │    │
//! │  │  CalibrationStore · DecisionAggregator · Relay         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

#[cfg(not(feature = "sim"))]
compile_error!(
    "no native gas-classification engine is linked into this build; \
     enable the `sim` feature to run the replayed classifier"
);

use anyhow::Result;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use firenode::adapters::log_sink::LogEventSink;
use firenode::adapters::nvs::NvsAdapter;
use firenode::adapters::sim::SimEngine;
use firenode::adapters::sleep::SleepAdapter;
use firenode::adapters::time::{Esp32TimeAdapter, TaskDelay};
use firenode::app::ports::{ConfigPort, RadioPort};
use firenode::config::NodeConfig;
use firenode::drivers::alarm::AlarmOutputs;
use firenode::drivers::gpio::GpioOutput;
use firenode::drivers::sx1262::Sx1262;
use firenode::pins;
use firenode::scheduler::{ActiveOutcome, DutyCycle};
use firenode::telemetry::RADIO_TX_DONE;

/// Classification profile handed to the engine at boot.
const ENGINE_PROFILE: &[u8] = b"fire-vs-air/2class/scan";

/// Park the CPU after a fatal error.  The task watchdog or a power cycle
/// is the only way out.
fn halt() -> ! {
    #[allow(clippy::empty_loop)]
    loop {}
}

/// SX1262 on VSPI; NSS is driven by the SPI driver, DIO1 by `hw_init`.
fn build_radio(p: Peripherals) -> Result<impl RadioPort> {
    let spi = SpiDeviceDriver::new_single(
        p.spi3,
        p.pins.gpio18, // RADIO_SCK_GPIO
        p.pins.gpio23, // RADIO_MOSI_GPIO
        Some(p.pins.gpio19), // RADIO_MISO_GPIO
        Some(p.pins.gpio5), // RADIO_NSS_GPIO
        &SpiDriverConfig::default(),
        &SpiConfig::new()
            .baudrate(Hertz(8_000_000))
            .data_mode(embedded_hal::spi::MODE_0),
    )?;
    let reset = PinDriver::output(p.pins.gpio14)?; // RADIO_NRST_GPIO
    let busy = PinDriver::input(p.pins.gpio4)?; // RADIO_BUSY_GPIO
    Ok(Sx1262::new(spi, reset, busy, Ets, &RADIO_TX_DONE))
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("FireNode v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = firenode::drivers::hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        halt();
    }
    if let Err(e) = firenode::drivers::hw_init::init_isr_service() {
        error!("ISR service init failed: {}, halting", e);
        halt();
    }

    let radio = match Peripherals::take()
        .map_err(anyhow::Error::from)
        .and_then(build_radio)
    {
        Ok(r) => r,
        Err(e) => {
            error!("Radio bus init failed: {}, halting", e);
            halt();
        }
    };

    // ── 3. Storage + config ───────────────────────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            error!("NVS init failed ({}), halting", e);
            halt();
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            NodeConfig::default()
        }
    };

    // ── 4. Adapters ───────────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut delay = TaskDelay;
    let mut sink = LogEventSink::new();
    let mut sleep = SleepAdapter::new();
    let mut alarms = AlarmOutputs::new(
        GpioOutput::new(pins::FIRE_ALARM_GPIO),
        GpioOutput::new(pins::AIR_ALARM_GPIO),
    );

    let mut cycle = DutyCycle::new(config, SimEngine::new(), nvs, radio);

    // ── 5. BOOT ───────────────────────────────────────────────
    if let Err(e) = cycle.boot(ENGINE_PROFILE, &mut sleep, &mut sink) {
        error!("Boot failed: {}, halting", e);
        halt();
    }

    // ── 6. ACTIVE ─────────────────────────────────────────────
    match cycle.run_active(&clock, &mut alarms, &mut delay, &mut sink) {
        Ok(report) => match report.outcome {
            ActiveOutcome::Decided(d) => info!(
                "Cycle: decided (fire={}, air={}, saved={})",
                d.fire, d.ambient_air, report.calibration_saved
            ),
            ActiveOutcome::TimedOut => warn!("Cycle: timed out"),
        },
        Err(e) => warn!("Cycle: {}", e),
    }

    // ── 7. SLEEP (does not return) ────────────────────────────
    cycle.sleep(&mut sleep, &mut delay, &mut sink);
    Ok(())
}
