//! Deep-sleep / wake adapter.
//!
//! - **`target_os = "espidf"`**: RTC timer wake source and
//!   `esp_deep_sleep_start()`, which never returns; the next cycle starts
//!   from reset.
//! - **`not(target_os = "espidf")`**: records what was requested so host
//!   runs and tests can inspect it, then returns.

use log::info;

use crate::app::ports::{SleepPort, WakeCause};

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

#[derive(Default)]
pub struct SleepAdapter {
    #[cfg(not(target_os = "espidf"))]
    armed: Vec<u32>,
    #[cfg(not(target_os = "espidf"))]
    slept: bool,
    #[cfg(not(target_os = "espidf"))]
    wake: Option<WakeCause>,
}

impl SleepAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the previous cycle ended with `cause`.
    #[cfg(not(target_os = "espidf"))]
    pub fn with_wake_cause(cause: WakeCause) -> Self {
        Self {
            wake: Some(cause),
            ..Self::default()
        }
    }

    /// Every wake-timer duration armed, in order.
    #[cfg(not(target_os = "espidf"))]
    pub fn armed_secs(&self) -> &[u32] {
        &self.armed
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn slept(&self) -> bool {
        self.slept
    }
}

impl SleepPort for SleepAdapter {
    #[cfg(target_os = "espidf")]
    fn wake_cause(&self) -> WakeCause {
        // SAFETY: read-only query of the RTC controller's latched cause.
        let cause = unsafe { esp_sleep_get_wakeup_cause() };
        #[allow(non_upper_case_globals)]
        match cause {
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeCause::PowerOn,
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeCause::Timer,
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 | esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT1 => {
                WakeCause::External
            }
            _ => WakeCause::Other,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn wake_cause(&self) -> WakeCause {
        self.wake.unwrap_or(WakeCause::PowerOn)
    }

    fn arm_wake_timer(&mut self, secs: u32) {
        info!("Sleep: wake timer armed for {} s", secs);

        #[cfg(target_os = "espidf")]
        // SAFETY: configures the RTC timer wake source; no memory is shared.
        unsafe {
            esp_sleep_enable_timer_wakeup(u64::from(secs) * 1_000_000);
        }

        #[cfg(not(target_os = "espidf"))]
        self.armed.push(secs);
    }

    fn deep_sleep(&mut self) {
        info!("Sleep: entering deep sleep");

        #[cfg(target_os = "espidf")]
        // SAFETY: does not return; RAM is discarded and the next cycle
        // reads everything it needs from NVS.
        unsafe {
            esp_deep_sleep_start();
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.slept = true;
        }
    }
}
