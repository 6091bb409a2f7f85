//! The protocol engine: one state value, three event sources, one
//! serialized dispatcher.

use crate::beeper::{Beeper, Sounder};
use crate::codes;
use crate::division::{Divisions, RepeatBuffers};
use crate::host::Frame;
use crate::keyboard::{KeysDown, HID_REPORT_SIZE};
use crate::leds::{Indicator, IndicatorPanel};
use crate::metronome::Metronome;
use crate::serial::{HostLink, SerialOutput};

/// One event from any of the three sources feeding the engine.
///
/// Events are queued by their producers and consumed by a single task; the
/// engine mutates state only inside [`Engine::handle`].
#[derive(Debug, Clone)]
pub enum Event {
    /// An 8-byte HID boot-protocol report from the wireless keyboard.
    Report([u8; HID_REPORT_SIZE]),
    /// A complete command frame from the host terminal.
    Command(Frame),
    /// A 1 ms metronome tick.
    Tick,
}

/// The LK201 keyboard emulation.
///
/// Owns every piece of mutable protocol state along with the three
/// peripheral endpoints. All methods are synchronous; timing comes in from
/// the caller as milliseconds since boot.
pub struct Engine<L, S, P> {
    pub(crate) serial: SerialOutput<L>,
    pub(crate) beeper: Beeper<S>,
    pub(crate) leds: P,
    pub(crate) divisions: Divisions,
    pub(crate) repeat_buffers: RepeatBuffers,
    pub(crate) keys: KeysDown,
    pub(crate) last_report: [u8; HID_REPORT_SIZE],
    pub(crate) metronome: Metronome,
    pub(crate) test_mode: bool,
    pub(crate) ctrl_keyclick: bool,
}

impl<L: HostLink, S: Sounder, P: IndicatorPanel> Engine<L, S, P> {
    /// Builds an engine in its power-up state. Call [`Engine::power_up`]
    /// afterwards to transmit the power-up frame to the host.
    pub fn new(link: L, sounder: S, leds: P) -> Self {
        Self {
            serial: SerialOutput::new(link),
            beeper: Beeper::new(sounder),
            leds,
            divisions: Divisions::default(),
            repeat_buffers: RepeatBuffers::default(),
            keys: KeysDown::default(),
            last_report: [0x00; HID_REPORT_SIZE],
            metronome: Metronome::new(),
            test_mode: false,
            ctrl_keyclick: true,
        }
    }

    /// Dispatches one event. `now` is milliseconds since boot and must not
    /// run backwards.
    pub fn handle(&mut self, event: &Event, now: u64) {
        match event {
            Event::Report(report) => self.hid_event(report, now),
            Event::Command(frame) => self.host_event(frame),
            Event::Tick => self.metronome_event(now),
        }
    }

    /// Re-initializes to defaults and transmits the power-up frame: both
    /// keyboard ID bytes, then the self-test pass and no-key-down slots.
    pub fn power_up(&mut self) {
        self.test_mode = false;
        self.reinstate_defaults();
        self.serial.reset();
        self.serial.write(&codes::POWER_UP_TRANSMISSION);
    }

    /// Restores division modes, repeat timing, volumes, the LEDs and the
    /// metronome to their power-up defaults. Pressed keys and the report
    /// cache survive, so held keys do not reappear as fresh presses.
    pub(crate) fn reinstate_defaults(&mut self) {
        self.divisions.reset();
        self.repeat_buffers.reset();
        self.beeper.reset();
        self.metronome.reset();
        self.ctrl_keyclick = true;
        for indicator in Indicator::ALL {
            self.leds.set(indicator, false);
        }
    }
}
