//! Push-pull GPIO output exposed as an `embedded-hal` [`OutputPin`].
//!
//! On ESP-IDF: writes through [`hw_init::gpio_write`] to a pin configured
//! by `init_peripherals`.  On host/test: tracks the level in memory only.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use crate::drivers::hw_init;

pub struct GpioOutput {
    pin: i32,
    high: bool,
}

impl GpioOutput {
    /// Wrap an already-configured output pin.  Starts low.
    pub fn new(pin: i32) -> Self {
        hw_init::gpio_write(pin, false);
        Self { pin, high: false }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for GpioOutput {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
