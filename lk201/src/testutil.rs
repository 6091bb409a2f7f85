//! Shared unit-test fixtures: mock peripherals, report and frame builders,
//! and inspection helpers for the engine.

use crate::beeper::Sounder;
use crate::engine::Engine;
use crate::host::Frame;
use crate::leds::{Indicator, IndicatorPanel};
use crate::serial::HostLink;

pub(crate) type TestEngine = Engine<MockLink, MockSounder, MockPanel>;

/// Host link that records every transmitted byte.
#[derive(Debug, Default)]
pub(crate) struct MockLink {
    sent: Vec<u8>,
}

impl MockLink {
    pub(crate) fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }
}

impl HostLink for MockLink {
    fn send(&mut self, bytes: &[u8]) {
        self.sent.extend_from_slice(bytes);
    }

    fn flush(&mut self) {}
}

/// Sounder that records every beep as (volume, duration).
#[derive(Debug, Default)]
pub(crate) struct MockSounder {
    pub(crate) beeps: Vec<(u8, u32)>,
}

impl Sounder for MockSounder {
    fn beep(&mut self, volume: u8, duration_ms: u32) {
        self.beeps.push((volume, duration_ms));
    }
}

/// Indicator panel that records the on/off state of each LED.
#[derive(Debug, Default)]
pub(crate) struct MockPanel {
    pub(crate) on: [bool; 4],
}

impl IndicatorPanel for MockPanel {
    fn set(&mut self, indicator: Indicator, on: bool) {
        self.on[indicator.index()] = on;
    }
}

pub(crate) const EMPTY_REPORT: [u8; 8] = [0x00; 8];

pub(crate) fn engine() -> TestEngine {
    Engine::new(
        MockLink::default(),
        MockSounder::default(),
        MockPanel::default(),
    )
}

/// Builds a boot-protocol report from a modifier byte and pressed usages.
pub(crate) fn report(modifiers: u8, keys: &[u8]) -> [u8; 8] {
    let mut report = EMPTY_REPORT;
    report[0] = modifiers;
    report[2..2 + keys.len()].copy_from_slice(keys);
    report
}

/// Builds a command frame from literal wire bytes.
pub(crate) fn frame(bytes: &[u8]) -> Frame {
    Frame::from_slice(bytes).unwrap()
}

impl Engine<MockLink, MockSounder, MockPanel> {
    /// Drains and returns everything transmitted to the host so far.
    pub(crate) fn sent(&mut self) -> Vec<u8> {
        self.serial.link.take()
    }

    pub(crate) fn beep_count(&self) -> usize {
        self.beeper.sounder().beeps.len()
    }

    pub(crate) fn last_beep(&self) -> Option<(u8, u32)> {
        self.beeper.sounder().beeps.last().copied()
    }

    pub(crate) fn led_state(&self) -> [bool; 4] {
        self.leds.on
    }

    pub(crate) fn division_config(
        &self,
        division: crate::division::Division,
    ) -> crate::division::DivisionConfig {
        self.divisions.get(division)
    }

    pub(crate) fn repeat_buffer(&self, buffer: usize) -> crate::division::RepeatBuffer {
        self.repeat_buffers.get(buffer)
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.serial.locked()
    }

    pub(crate) fn is_key_down(&self, keycode: u8) -> bool {
        self.keys.contains(keycode)
    }

    pub(crate) fn set_ctrl_keyclick(&mut self, enabled: bool) {
        self.ctrl_keyclick = enabled;
    }
}
