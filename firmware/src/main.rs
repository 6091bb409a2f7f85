//! ESP32-C3 firmware that makes a Bluetooth LE keyboard look like a DEC
//! LK201 to a vintage serial host.

#![allow(clippy::multiple_crate_versions)]

use embassy_time::{Duration, Instant, Ticker};
use esp_idf_svc::hal::{peripherals::Peripherals, task};
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::StreamExt;
use lk201::beeper::Sounder;
use lk201::leds::IndicatorPanel;
use lk201::serial::HostLink;
use lk201::{Engine, Event};

mod beeper;
mod ble;
mod led;
mod uart;

/// Depth of the queue multiplexing HID reports, host command frames and
/// metronome ticks into the engine. Producers drop on overflow instead of
/// blocking their own context.
const EVENT_QUEUE_DEPTH: usize = 32;

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    log::debug!("Initializing peripherals...");

    let peripherals = Peripherals::take()?;

    let mut status_led = led::Blinker::from(led::Led::new(peripherals.pins.gpio8)?);

    let panel = led::Panel::new(
        peripherals.pins.gpio0,
        peripherals.pins.gpio1,
        peripherals.pins.gpio2,
        peripherals.pins.gpio3,
    )?;

    let (beeps_tx, beeps_rx) = channel::<beeper::Beep>(beeper::QUEUE_DEPTH);
    let mut pwm = beeper::Pwm::new(
        peripherals.ledc.timer0,
        peripherals.ledc.channel0,
        peripherals.pins.gpio10,
    )?;

    let (host_link, host_rx) = uart::open(
        peripherals.uart1,
        peripherals.pins.gpio21,
        peripherals.pins.gpio20,
        peripherals.pins.gpio7,
    )?;

    let (events_tx, events_rx) = channel::<Event>(EVENT_QUEUE_DEPTH);

    let engine = Engine::new(host_link, beeper::Chime::new(beeps_tx), panel);

    let mut keyboards = ble::Keyboards::new(events_tx.clone());

    log::debug!("Peripherals fully initialized");

    task::block_on(async {
        futures::try_join!(
            run_engine(engine, events_rx),
            run_metronome(events_tx.clone()),
            uart::receive(host_rx, events_tx.clone()),
            pwm.run(beeps_rx),
            keyboards.run(&mut status_led),
        )
    })?;

    Ok(())
}

/// Consumes the event queue. The only task that touches engine state, so
/// every handler observes tables, keys-down bookkeeping and flow control
/// consistently.
async fn run_engine<L, S, P>(
    mut engine: Engine<L, S, P>,
    mut events: Receiver<Event>,
) -> anyhow::Result<()>
where
    L: HostLink,
    S: Sounder,
    P: IndicatorPanel,
{
    engine.power_up();

    while let Some(event) = events.next().await {
        engine.handle(&event, Instant::now().as_millis());
    }

    Ok(())
}

/// Posts a tick every millisecond. A tick that finds the queue full is
/// dropped; the next one is a millisecond away.
async fn run_metronome(mut events: Sender<Event>) -> anyhow::Result<()> {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        ticker.next().await;
        let _ = events.try_send(Event::Tick);
    }
}
