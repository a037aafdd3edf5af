//! Alarm indicator outputs.
//!
//! Two independent active-high channels.  Software only ever asserts them;
//! they stay high until the next boot re-initialises the pins low.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{AlarmChannel, AlarmPort};
use crate::fsm::AlarmDecision;

/// Fire and ambient-air indicator pins.
pub struct AlarmOutputs<F: OutputPin, A: OutputPin> {
    fire: F,
    air: A,
}

impl<F: OutputPin, A: OutputPin> AlarmOutputs<F, A> {
    pub fn new(fire: F, air: A) -> Self {
        Self { fire, air }
    }

    pub fn release(self) -> (F, A) {
        (self.fire, self.air)
    }
}

impl<F: OutputPin, A: OutputPin> AlarmPort for AlarmOutputs<F, A> {
    fn set_alarm(&mut self, channel: AlarmChannel, active: bool) {
        let result = match (channel, active) {
            (AlarmChannel::Fire, true) => self.fire.set_high().map_err(|_| ()),
            (AlarmChannel::Fire, false) => self.fire.set_low().map_err(|_| ()),
            (AlarmChannel::AmbientAir, true) => self.air.set_high().map_err(|_| ()),
            (AlarmChannel::AmbientAir, false) => self.air.set_low().map_err(|_| ()),
        };
        if result.is_err() {
            warn!("Alarm: {:?} pin write failed", channel);
        }
    }
}

/// Assert every channel the decision calls for.  Channels not called for
/// are left alone.
pub fn actuate(alarms: &mut impl AlarmPort, decision: &AlarmDecision) {
    if decision.fire {
        info!("Alarm: FIRE asserted");
        alarms.set_alarm(AlarmChannel::Fire, true);
    }
    if decision.ambient_air {
        info!("Alarm: AIR asserted");
        alarms.set_alarm(AlarmChannel::AmbientAir, true);
    }
}
