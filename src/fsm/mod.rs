//! Decision aggregator state machine.
//!
//! ```text
//!   WAITING ──(first tick)──▶ ACCUMULATING ──(warm-up reached)──▶ DECIDED
//!      ▲                                                              │
//!      └──────────────────────────── reset() ─────────────────────────┘
//! ```
//!
//! Fed by the engine adapter through [`OutputDelegate`].  A tick counts
//! once per batch that carries the fire-class estimate, however many other
//! signals ride along.  When the count reaches the warm-up threshold each
//! class is compared against the confidence threshold independently and an
//! [`AlarmDecision`] is parked for the scheduler to collect.

pub mod context;

pub use context::{ClassProbabilities, LatestReadings};

use log::info;

use crate::app::ports::OutputDelegate;
use crate::config::NodeConfig;
use crate::engine::{OutputSample, SignalId};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DecisionState {
    Waiting = 0,
    Accumulating = 1,
    /// Terminal for the wake cycle.
    Decided = 2,
}

/// Which alarms to assert, and the estimates that led there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmDecision {
    pub fire: bool,
    pub ambient_air: bool,
    pub probabilities: ClassProbabilities,
}

impl AlarmDecision {
    pub fn any(&self) -> bool {
        self.fire || self.ambient_air
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct DecisionAggregator {
    warmup_ticks: u8,
    threshold_percent: f32,

    state: DecisionState,
    /// High-confidence ticks seen this wake cycle.
    ticks: u8,
    last: ClassProbabilities,
    readings: LatestReadings,
    pending: Option<AlarmDecision>,
}

impl DecisionAggregator {
    pub fn new(warmup_ticks: u8, threshold_percent: f32) -> Self {
        Self {
            warmup_ticks: warmup_ticks.max(1),
            threshold_percent,
            state: DecisionState::Waiting,
            ticks: 0,
            last: ClassProbabilities::default(),
            readings: LatestReadings::default(),
            pending: None,
        }
    }

    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self::new(cfg.warmup_ticks, cfg.confidence_threshold_percent)
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    pub fn ticks(&self) -> u8 {
        self.ticks
    }

    /// Class estimates from the most recent completed tick.
    pub fn probabilities(&self) -> ClassProbabilities {
        self.last
    }

    pub fn readings(&self) -> &LatestReadings {
        &self.readings
    }

    /// Collect the decision once; later calls return `None`.
    pub fn take_decision(&mut self) -> Option<AlarmDecision> {
        self.pending.take()
    }

    /// Back to WAITING with a zero counter.  Latest readings are kept.
    pub fn reset(&mut self) {
        self.state = DecisionState::Waiting;
        self.ticks = 0;
        self.last = ClassProbabilities::default();
        self.pending = None;
    }

    fn crosses(&self, probability: Option<f32>) -> bool {
        probability.is_some_and(|p| p * 100.0 > self.threshold_percent)
    }

    fn decide(&mut self) {
        let decision = AlarmDecision {
            fire: self.crosses(self.last.fire),
            ambient_air: self.crosses(self.last.ambient_air),
            probabilities: self.last,
        };
        info!(
            "Aggregator: decided after {} ticks (fire={}, air={})",
            self.ticks, decision.fire, decision.ambient_air
        );
        self.state = DecisionState::Decided;
        self.pending = Some(decision);
    }
}

impl OutputDelegate for DecisionAggregator {
    fn on_outputs(&mut self, outputs: &[OutputSample]) {
        if outputs.is_empty() || self.state == DecisionState::Decided {
            return;
        }

        self.readings.update(outputs);

        // GasEstimate1 and GasEstimate2 share one accuracy group; the first
        // one marks tick completion.
        if !outputs.iter().any(|s| s.id == SignalId::GasEstimate1) {
            return;
        }

        self.last = ClassProbabilities::from_batch(outputs);
        self.ticks = self.ticks.saturating_add(1);
        if let Some(pct) = self.last.fire_percent() {
            info!("FIRE probability : {:.2}%", pct);
        }
        if let Some(pct) = self.last.ambient_air_percent() {
            info!("AIR probability : {:.2}%", pct);
        }

        if self.ticks >= self.warmup_ticks {
            self.decide();
        } else {
            self.state = DecisionState::Accumulating;
        }
    }
}
