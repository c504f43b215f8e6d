//! Single-colour uplink status LED.
//!
//! Driven from its own thread at the configured blink period:
//!
//! | Uplink      | LED                         |
//! |-------------|-----------------------------|
//! | associated  | steady off (active-high)    |
//! | not yet     | toggles every tick          |
//!
//! Generic over any `embedded_hal` output pin, so host tests use a mock
//! and the device uses an `esp_idf_svc::hal::gpio::PinDriver`.

use embedded_hal::digital::OutputPin;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Starts lit, matching the pin's power-on level.
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_high()?;
        Ok(Self { pin, lit: true })
    }

    /// Advance one blink period.
    pub fn tick(&mut self, connected: bool) -> Result<(), P::Error> {
        if connected {
            if self.lit {
                self.pin.set_low()?;
                self.lit = false;
            }
            return Ok(());
        }
        if self.lit {
            self.pin.set_low()?;
        } else {
            self.pin.set_high()?;
        }
        self.lit = !self.lit;
        Ok(())
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
