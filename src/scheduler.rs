//! Duty-cycle scheduler.
//!
//! One process instance runs exactly one wake cycle:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BOOT                                                        │
//! │    wake cause → engine profile → calibration load →          │
//! │    subscribe → radio PHY (fatal on reject) → arm wake timer  │
//! │                          │                                   │
//! │                          ▼                                   │
//! │  ACTIVE                                                      │
//! │    engine.tick() ──▶ DecisionAggregator                      │
//! │        │ DECIDED                         │ max_active_secs   │
//! │        ▼                                 ▼                   │
//! │    actuate → save (gated) → telemetry    (timeout)           │
//! │                          │                                   │
//! │                          ▼                                   │
//! │  SLEEP                                                       │
//! │    pre-sleep delay → arm timer → deep sleep (no return)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistent storage is the only state that survives into the next BOOT.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::events::{AppEvent, CalibrationStatus};
use crate::app::ports::{AlarmPort, ByteStore, Clock, EventSink, GasEngine, RadioPort, SleepPort};
use crate::calibration::{CalibrationStore, LoadOutcome, SaveGate};
use crate::config::NodeConfig;
use crate::drivers::alarm;
use crate::engine::{DEFAULT_SUBSCRIPTION, EngineAdapter};
use crate::error::{Error, RadioError, Result, TelemetryError};
use crate::fsm::{AlarmDecision, DecisionAggregator};
use crate::telemetry::TelemetryRelay;
use crate::telemetry::message::build_message;

/// Pause between engine polls while ACTIVE.
const POLL_INTERVAL_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Boot,
    Active,
    /// Terminal for the process instance.
    Sleep,
}

/// How the ACTIVE phase ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveOutcome {
    Decided(AlarmDecision),
    TimedOut,
}

/// What happened to this cycle's telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryOutcome {
    Sent { len: usize },
    /// The message could not be built; the radio was not touched.
    Skipped(TelemetryError),
    Failed(RadioError),
}

/// Summary of one ACTIVE phase, for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub outcome: ActiveOutcome,
    pub calibration_saved: bool,
    /// `None` when telemetry is disabled or no decision was reached.
    pub telemetry: Option<TelemetryOutcome>,
}

pub struct DutyCycle<E: GasEngine, S: ByteStore, R: RadioPort> {
    config: NodeConfig,
    phase: Phase,
    engine: EngineAdapter<E>,
    calibration: CalibrationStore<S>,
    relay: TelemetryRelay<R>,
    aggregator: DecisionAggregator,
    save_gate: SaveGate,
    /// Cleared when the boot-time load hit a storage failure.
    persistence_ok: bool,
}

impl<E: GasEngine, S: ByteStore, R: RadioPort> DutyCycle<E, S, R> {
    pub fn new(config: NodeConfig, engine: E, store: S, radio: R) -> Self {
        Self {
            aggregator: DecisionAggregator::from_config(&config),
            save_gate: SaveGate::new(config.state_save_period_ms),
            config,
            phase: Phase::Boot,
            engine: EngineAdapter::new(engine),
            calibration: CalibrationStore::new(store),
            relay: TelemetryRelay::new(radio),
            persistence_ok: true,
        }
    }

    // ── BOOT ─────────────────────────────────────────────────────

    /// Bring every collaborator up.  Only a radio rejection is fatal.
    pub fn boot(
        &mut self,
        profile: &[u8],
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let wake = sleep.wake_cause();
        info!("DutyCycle: boot (wake cause {:?})", wake);

        if let Err(e) = self.engine.configure(profile) {
            warn!("DutyCycle: running with engine defaults ({})", e);
        }

        let calibration = match self.calibration.load(self.engine.engine_mut()) {
            Ok(LoadOutcome::Restored(_)) => CalibrationStatus::Restored,
            Ok(LoadOutcome::NoPriorState) => CalibrationStatus::FactoryDefaults,
            Err(e) => {
                warn!("DutyCycle: calibration load failed ({}), persistence off", e);
                self.persistence_ok = false;
                CalibrationStatus::Degraded
            }
        };

        if let Err(e) = self
            .engine
            .subscribe(&DEFAULT_SUBSCRIPTION, self.config.sample_rate)
        {
            warn!("DutyCycle: subscription failed ({})", e);
        }

        if let Err(e) = self.relay.configure(&self.config.radio) {
            error!("DutyCycle: radio PHY rejected (code {}), halting", e.code());
            return Err(Error::Radio(e));
        }

        sleep.arm_wake_timer(self.config.boot_wake_timer_secs);
        sink.emit(&AppEvent::Booted { wake, calibration });
        self.enter(Phase::Active, sink);
        Ok(())
    }

    // ── ACTIVE ───────────────────────────────────────────────────

    /// Tick the engine until the aggregator decides or time runs out.
    pub fn run_active(
        &mut self,
        clock: &impl Clock,
        alarms: &mut impl AlarmPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<CycleReport> {
        if self.phase != Phase::Active {
            return Err(Error::Init("run_active outside ACTIVE"));
        }

        let started = clock.uptime_ms();
        let budget_ms = u64::from(self.config.max_active_secs) * 1000;

        loop {
            let now = clock.uptime_ms();
            let elapsed_ms = now.saturating_sub(started);
            if elapsed_ms >= budget_ms {
                warn!("DutyCycle: no decision after {} ms", elapsed_ms);
                sink.emit(&AppEvent::ActiveTimeout { elapsed_ms });
                self.enter(Phase::Sleep, sink);
                return Ok(CycleReport {
                    outcome: ActiveOutcome::TimedOut,
                    calibration_saved: false,
                    telemetry: None,
                });
            }

            let before = self.aggregator.ticks();
            match self.engine.tick(now, &mut self.aggregator) {
                Ok(true) => {}
                Ok(false) => {
                    delay.delay_ms(POLL_INTERVAL_MS);
                    continue;
                }
                Err(e) => {
                    warn!("DutyCycle: engine pass failed ({})", e);
                    delay.delay_ms(POLL_INTERVAL_MS);
                    continue;
                }
            }

            if self.aggregator.ticks() != before {
                sink.emit(&AppEvent::ClassTick {
                    count: self.aggregator.ticks(),
                    probabilities: self.aggregator.probabilities(),
                });
            }

            if let Some(decision) = self.aggregator.take_decision() {
                let report = self.on_decided(decision, clock, alarms, sink);
                self.enter(Phase::Sleep, sink);
                return Ok(report);
            }
        }
    }

    fn on_decided(
        &mut self,
        decision: AlarmDecision,
        clock: &impl Clock,
        alarms: &mut impl AlarmPort,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        alarm::actuate(alarms, &decision);
        sink.emit(&AppEvent::AlarmDecision {
            fire: decision.fire,
            ambient_air: decision.ambient_air,
            probabilities: decision.probabilities,
        });

        let calibration_saved = self.persist_if_due(clock.uptime_ms(), sink);

        let telemetry = if self.config.telemetry_enabled {
            Some(self.send_telemetry(&decision, sink))
        } else {
            None
        };

        CycleReport {
            outcome: ActiveOutcome::Decided(decision),
            calibration_saved,
            telemetry,
        }
    }

    /// Gated calibration write-back.  Returns `true` if a save succeeded.
    pub fn persist_if_due(&mut self, uptime_ms: u64, sink: &mut impl EventSink) -> bool {
        if !self.persistence_ok || !self.save_gate.is_due(uptime_ms) {
            return false;
        }
        self.save_gate.mark_saved();

        match self.calibration.save(self.engine.engine_mut()) {
            Ok(()) => {
                sink.emit(&AppEvent::CalibrationSaved {
                    bytes: self.engine.engine().state_blob_size(),
                });
                true
            }
            Err(e) => {
                sink.emit(&AppEvent::CalibrationSaveFailed(e));
                false
            }
        }
    }

    fn send_telemetry(
        &mut self,
        decision: &AlarmDecision,
        sink: &mut impl EventSink,
    ) -> TelemetryOutcome {
        let msg = match build_message(
            &self.config.telemetry_format,
            self.aggregator.readings(),
            &decision.probabilities,
        ) {
            Ok(m) => m,
            Err(e) => {
                warn!("DutyCycle: telemetry skipped ({})", e);
                return TelemetryOutcome::Skipped(e);
            }
        };

        match self.relay.send(msg.as_bytes()) {
            Ok(()) => {
                sink.emit(&AppEvent::TelemetrySent { len: msg.len() });
                TelemetryOutcome::Sent { len: msg.len() }
            }
            Err(e) => {
                sink.emit(&AppEvent::TelemetryFailed(e.code()));
                TelemetryOutcome::Failed(e)
            }
        }
    }

    // ── SLEEP ────────────────────────────────────────────────────

    /// Enter deep sleep.  Does not return on hardware.
    pub fn sleep(
        &mut self,
        sleep: &mut impl SleepPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        if self.phase != Phase::Sleep {
            self.enter(Phase::Sleep, sink);
        }
        delay.delay_ms(self.config.pre_sleep_delay_ms);
        self.aggregator.reset();

        let secs = self.config.deep_sleep_secs;
        sink.emit(&AppEvent::Sleeping { secs });
        sleep.arm_wake_timer(secs);
        sleep.deep_sleep();
    }

    fn enter(&mut self, to: Phase, sink: &mut impl EventSink) {
        let from = self.phase;
        self.phase = to;
        sink.emit(&AppEvent::PhaseChanged { from, to });
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &DecisionAggregator {
        &self.aggregator
    }

    pub fn calibration(&self) -> &CalibrationStore<S> {
        &self.calibration
    }

    pub fn relay(&self) -> &TelemetryRelay<R> {
        &self.relay
    }

    pub fn engine(&self) -> &E {
        self.engine.engine()
    }

    pub fn persistence_ok(&self) -> bool {
        self.persistence_ok
    }
}
