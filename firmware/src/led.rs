//! The Bluetooth status LED and the four LK201 indicator LEDs.

use embassy_time::{Duration, Timer};
use esp_idf_svc::{
    hal::gpio::{AnyOutputPin, Output, PinDriver},
    sys::EspError,
};
use lk201::leds::{Indicator, IndicatorPanel};

/// A single LED on a GPIO output.
pub struct Led<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> Led<'d> {
    /// Configures the GPIO pin as an output with the LED off.
    ///
    /// # Errors
    ///
    /// The method fails when the pin cannot be driven as an output.
    pub fn new(pin: impl Into<AnyOutputPin>) -> Result<Self, EspError> {
        Ok(Self {
            pin: PinDriver::output(pin.into())?,
        })
    }

    /// Turns the LED on.
    ///
    /// # Errors
    ///
    /// The method fails when the GPIO level cannot be set.
    pub fn on(&mut self) -> Result<(), EspError> {
        self.pin.set_high()
    }

    /// Turns the LED off.
    ///
    /// # Errors
    ///
    /// The method fails when the GPIO level cannot be set.
    pub fn off(&mut self) -> Result<(), EspError> {
        self.pin.set_low()
    }
}

/// Default on and off time of one scanning blink.
pub const DEFAULT_BLINK_DURATION: Duration = Duration::from_millis(100);

/// Wraps a [`Led`] with timed blinking for connection status display:
/// blinking while scanning, solid while a keyboard is connected.
pub struct Blinker<'d> {
    led: Led<'d>,
    blink_duration: Duration,
}

impl<'d> From<Led<'d>> for Blinker<'d> {
    fn from(led: Led<'d>) -> Self {
        Self {
            led,
            blink_duration: DEFAULT_BLINK_DURATION,
        }
    }
}

impl Blinker<'_> {
    /// Runs one on/off cycle.
    ///
    /// # Errors
    ///
    /// The method fails when the GPIO level cannot be set.
    pub async fn blink(&mut self) -> Result<(), EspError> {
        self.led.on()?;
        Timer::after(self.blink_duration).await;
        self.led.off()?;
        Timer::after(self.blink_duration).await;
        Ok(())
    }

    /// Leaves the LED on.
    ///
    /// # Errors
    ///
    /// The method fails when the GPIO level cannot be set.
    pub fn solid(&mut self) -> Result<(), EspError> {
        self.led.on()
    }

    /// Leaves the LED off.
    ///
    /// # Errors
    ///
    /// The method fails when the GPIO level cannot be set.
    pub fn dark(&mut self) -> Result<(), EspError> {
        self.led.off()
    }
}

/// The four LK201 indicator LEDs, in wire bit order: Wait, Compose, Lock,
/// Hold Screen.
pub struct Panel<'d> {
    leds: [Led<'d>; 4],
}

impl<'d> Panel<'d> {
    /// Configures the four indicator outputs, all off.
    ///
    /// # Errors
    ///
    /// The method fails when any pin cannot be driven as an output.
    pub fn new(
        wait: impl Into<AnyOutputPin>,
        compose: impl Into<AnyOutputPin>,
        lock: impl Into<AnyOutputPin>,
        hold_screen: impl Into<AnyOutputPin>,
    ) -> Result<Self, EspError> {
        Ok(Self {
            leds: [
                Led::new(wait)?,
                Led::new(compose)?,
                Led::new(lock)?,
                Led::new(hold_screen)?,
            ],
        })
    }
}

impl IndicatorPanel for Panel<'_> {
    fn set(&mut self, indicator: Indicator, on: bool) {
        let led = &mut self.leds[indicator.index()];
        let result = if on { led.on() } else { led.off() };
        if let Err(err) = result {
            log::warn!("failed to switch {indicator:?}: {err}");
        }
    }
}
