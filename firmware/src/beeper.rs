//! The keyboard beeper: an LEDC square wave with a one-shot turn-off.

use embassy_time::{Duration, Timer};
use esp_idf_svc::{
    hal::{
        gpio::OutputPin,
        ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, CHANNEL0, TIMER0},
        peripheral::Peripheral,
        units::FromValueType,
    },
    sys::EspError,
};
use futures::channel::mpsc::{Receiver, Sender};
use futures::StreamExt;
use lk201::beeper::Sounder;

/// Depth of the queue between the engine and the PWM task.
pub const QUEUE_DEPTH: usize = 4;

/// One requested sound.
#[derive(Debug, Clone, Copy)]
pub struct Beep {
    volume: u8,
    duration_ms: u32,
}

/// The engine-facing half: posts beep requests to the PWM task without
/// ever blocking the event loop.
pub struct Chime {
    requests: Sender<Beep>,
}

impl Chime {
    /// Creates the request side of the beeper.
    pub fn new(requests: Sender<Beep>) -> Self {
        Self { requests }
    }
}

impl Sounder for Chime {
    fn beep(&mut self, volume: u8, duration_ms: u32) {
        // Dropped when the PWM task is still busy with an earlier sound.
        if self
            .requests
            .try_send(Beep {
                volume,
                duration_ms,
            })
            .is_err()
        {
            log::debug!("beeper busy, dropping beep");
        }
    }
}

/// The playback half: owns the LEDC channel, so on and off can never
/// interleave between sounds.
pub struct Pwm<'d> {
    driver: LedcDriver<'d>,
    _timer: LedcTimerDriver<'d>,
}

impl<'d> Pwm<'d> {
    /// Configures the LEDC timer and channel, output silent.
    ///
    /// # Errors
    ///
    /// The method fails when the LEDC peripheral cannot be configured.
    pub fn new(
        timer: impl Peripheral<P = TIMER0> + 'd,
        channel: impl Peripheral<P = CHANNEL0> + 'd,
        pin: impl Peripheral<P = impl OutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let timer = LedcTimerDriver::new(timer, &TimerConfig::default().frequency(2.kHz().into()))?;
        let mut driver = LedcDriver::new(channel, &timer, pin)?;
        driver.set_duty(0)?;
        Ok(Self {
            driver,
            _timer: timer,
        })
    }

    /// Plays queued beeps one at a time.
    ///
    /// # Errors
    ///
    /// The task aborts when the duty cycle cannot be set.
    pub async fn run(&mut self, mut requests: Receiver<Beep>) -> anyhow::Result<()> {
        while let Some(beep) = requests.next().await {
            self.on(beep.volume)?;
            Timer::after(Duration::from_millis(u64::from(beep.duration_ms))).await;
            self.off()?;
        }
        Ok(())
    }

    fn on(&mut self, volume: u8) -> Result<(), EspError> {
        // Half duty is the loudest square wave; every volume step away
        // from 0 trims an eighth of it.
        let pulse = (self.driver.get_max_duty() / 2) * u32::from(8 - volume) / 8;
        self.driver.set_duty(pulse)
    }

    fn off(&mut self) -> Result<(), EspError> {
        self.driver.set_duty(0)
    }
}
