//! Bluetooth LE central: finds a wireless keyboard, bonds with it, and
//! forwards its boot-protocol input reports into the event queue.

use embassy_time::{Duration, Timer};
use esp32_nimble::{
    enums::{AuthReq, SecurityIOCap},
    utilities::BleUuid,
    BLEAdvertisedDevice, BLEClient, BLEDevice,
};
use futures::channel::mpsc::Sender;
use futures::future::{select, Either};
use lk201::Event;
use log::{info, warn};

use crate::led;

/// GATT Human Interface Device service.
const HID_SERVICE: BleUuid = BleUuid::Uuid16(0x1812);
/// Boot Keyboard Input Report characteristic.
const BOOT_KEYBOARD_INPUT_REPORT: BleUuid = BleUuid::Uuid16(0x2A22);

/// Passkey for keyboards that insist on numeric pairing.
const PASSKEY: u32 = 123_456;

/// Length of one scan pass before it is restarted.
const SCAN_PASS_MS: i32 = 10_000;

/// How often the link is checked once a keyboard is connected.
const CONNECTION_POLL: Duration = Duration::from_millis(500);

/// Connects to one wireless keyboard at a time, forever.
pub struct Keyboards {
    events: Sender<Event>,
}

impl Keyboards {
    /// Creates the client side; reports will be queued on `events`.
    pub fn new(events: Sender<Event>) -> Self {
        Self { events }
    }

    /// Scans, connects, subscribes, and rescans after a disconnect. The
    /// status LED blinks while scanning and stays solid while a keyboard
    /// is attached. The protocol engine never notices a disconnect beyond
    /// the absence of reports.
    ///
    /// # Errors
    ///
    /// Only status LED failures abort the task; Bluetooth errors are
    /// logged and answered with another scan pass.
    pub async fn run(&mut self, status: &mut led::Blinker<'_>) -> anyhow::Result<()> {
        let device = BLEDevice::take();
        device
            .security()
            .set_auth(AuthReq::Bond)
            .set_passkey(PASSKEY)
            .set_io_cap(SecurityIOCap::NoInputNoOutput);

        loop {
            let Some(keyboard) = Self::scan(device, status).await? else {
                continue;
            };
            info!("found keyboard {}", keyboard.addr());

            let mut client = BLEClient::new();
            if let Err(err) = self.subscribe(&mut client, &keyboard).await {
                warn!("keyboard setup failed: {err}");
                let _ = client.disconnect();
                continue;
            }

            status.solid()?;
            info!("keyboard connected");

            while client.connected() {
                Timer::after(CONNECTION_POLL).await;
            }

            status.dark()?;
            info!("keyboard disconnected");
        }
    }

    /// One scan pass, blinking the status LED while it runs. Returns the
    /// first device advertising the HID service, or `None` when the pass
    /// timed out or failed.
    async fn scan(
        device: &mut BLEDevice,
        status: &mut led::Blinker<'_>,
    ) -> anyhow::Result<Option<BLEAdvertisedDevice>> {
        let scan = device.get_scan();
        scan.active_scan(true).interval(100).window(99);

        let mut find = Box::pin(
            scan.find_device(SCAN_PASS_MS, |advertised| {
                advertised.is_advertising_service(&HID_SERVICE)
            }),
        );

        loop {
            let blink = Box::pin(status.blink());
            match select(find, blink).await {
                Either::Left((found, _)) => match found {
                    Ok(device) => return Ok(device),
                    Err(err) => {
                        warn!("scan pass failed: {err}");
                        return Ok(None);
                    }
                },
                Either::Right((blinked, pending)) => {
                    blinked?;
                    find = pending;
                }
            }
        }
    }

    /// Connects, encrypts the link, and subscribes to boot keyboard input
    /// report notifications.
    async fn subscribe(
        &mut self,
        client: &mut BLEClient,
        keyboard: &BLEAdvertisedDevice,
    ) -> anyhow::Result<()> {
        client.connect(keyboard.addr()).await?;
        // HID keyboards only notify over an encrypted, bonded link.
        client.secure_connection().await?;

        let service = client.get_service(HID_SERVICE).await?;
        let reports = service.get_characteristic(BOOT_KEYBOARD_INPUT_REPORT).await?;

        let mut events = self.events.clone();
        reports
            .on_notify(move |data| match <[u8; 8]>::try_from(data) {
                Ok(report) => {
                    if events.try_send(Event::Report(report)).is_err() {
                        warn!("event queue full, dropping HID report");
                    }
                }
                Err(_) => info!("ignoring notification of {} bytes", data.len()),
            })
            .subscribe_notify(false)
            .await?;

        Ok(())
    }
}
