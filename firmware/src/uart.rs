//! The LK201 host wire: UART1 at 4800 8-N-1 behind an RS-423 line driver.

use embassy_time::{Duration, Timer};
use esp_idf_svc::{
    hal::{
        delay,
        gpio::{AnyIOPin, AnyOutputPin, InputPin, Output, OutputPin, PinDriver},
        peripheral::Peripheral,
        uart::{config, UartDriver, UartRxDriver, UartTxDriver, UART1},
        units::Hertz,
    },
    sys::EspError,
};
use futures::channel::mpsc::Sender;
use lk201::serial::HostLink;
use lk201::{Event, Framer};

/// LK201 line rate.
const BAUD_RATE: u32 = 4800;

/// Idle poll period of the receive task. A host byte takes about two
/// milliseconds on the wire, so polling every millisecond loses nothing.
const RX_POLL: Duration = Duration::from_millis(1);

/// Opens the host UART and splits it into the engine-facing transmit half
/// and the receive half consumed by [`receive`]. `tx_enable` drives the
/// RS-423 line driver's enable input and stays asserted from here on.
///
/// # Errors
///
/// The function fails when the UART driver or the enable GPIO cannot be
/// configured.
pub fn open<'d>(
    uart: impl Peripheral<P = UART1> + 'd,
    tx: impl Peripheral<P = impl OutputPin> + 'd,
    rx: impl Peripheral<P = impl InputPin> + 'd,
    tx_enable: impl Into<AnyOutputPin>,
) -> Result<(HostTx<'d>, UartRxDriver<'d>), EspError> {
    let config = config::Config::new()
        .baudrate(Hertz(BAUD_RATE))
        .data_bits(config::DataBits::DataBits8)
        .parity_none()
        .stop_bits(config::StopBits::STOP1);

    let driver = UartDriver::new(
        uart,
        tx,
        rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &config,
    )?;
    let (tx_half, rx_half) = driver.split();

    let mut enable = PinDriver::output(tx_enable.into())?;
    enable.set_high()?;

    Ok((
        HostTx {
            tx: tx_half,
            _enable: enable,
        },
        rx_half,
    ))
}

/// Engine-facing transmit half. Writes block until the UART driver has
/// buffered every byte, which is what the engine's flow control expects.
pub struct HostTx<'d> {
    tx: UartTxDriver<'d>,
    _enable: PinDriver<'d, AnyOutputPin, Output>,
}

impl HostLink for HostTx<'_> {
    fn send(&mut self, bytes: &[u8]) {
        let mut written = 0;
        while written < bytes.len() {
            match self.tx.write(&bytes[written..]) {
                Ok(count) => written += count,
                Err(err) => {
                    log::warn!("host uart write failed: {err}");
                    return;
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.tx.wait_done(delay::BLOCK) {
            log::warn!("host uart flush failed: {err}");
        }
    }
}

/// Reads host bytes, assembles command frames, and queues them as events.
///
/// # Errors
///
/// The task aborts when the UART driver fails to read.
pub async fn receive(rx: UartRxDriver<'_>, mut events: Sender<Event>) -> anyhow::Result<()> {
    let mut framer = Framer::new();
    let mut buf = [0u8; 16];

    loop {
        let count = rx.read(&mut buf, delay::NON_BLOCK)?;
        for &byte in &buf[..count] {
            if let Some(frame) = framer.push(byte) {
                if events.try_send(Event::Command(frame)).is_err() {
                    log::warn!("event queue full, dropping host command");
                }
            }
        }
        if count == 0 {
            Timer::after(RX_POLL).await;
        }
    }
}
