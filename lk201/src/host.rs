//! Host command parsing and execution.
//!
//! Commands arrive one byte at a time on the LK201 wire. A frame runs until
//! a byte with bit 7 set; parameter bytes in between have bit 7 clear, so
//! single-byte commands are exactly the opcodes whose high bit is set.

use heapless::Vec;

use crate::beeper::Sounder;
use crate::codes;
use crate::division::{Division, DivisionConfig, Mode, RepeatBuffer, NUM_REPEAT_BUFFERS};
use crate::engine::Engine;
use crate::leds::{Indicator, IndicatorPanel};
use crate::serial::HostLink;

/// Longest accepted command frame.
pub const MAX_FRAME: usize = 4;

/// One complete command frame: 1-4 bytes, final byte with bit 7 set.
pub type Frame = Vec<u8, MAX_FRAME>;

/// Assembles the host byte stream into command frames.
///
/// Bytes with bit 7 clear accumulate as the head of the frame; a byte with
/// bit 7 set completes it. Over-long frames keep their first three bytes
/// and the terminator, matching the keyboard's four-byte command limit.
#[derive(Debug, Default)]
pub struct Framer {
    partial: Frame,
}

impl Framer {
    /// An empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received byte; returns the completed frame, if any.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if byte & 0x80 == 0 {
            if self.partial.len() < MAX_FRAME - 1 {
                let _ = self.partial.push(byte);
            }
            return None;
        }
        let mut frame = core::mem::take(&mut self.partial);
        // Cannot fail: accumulation stops one short of capacity.
        let _ = frame.push(byte);
        Some(frame)
    }
}

// Peripheral commands (first byte, bit 0 set).
const RESUME_TRANSMISSION: u8 = 0x8B;
const INHIBIT_TRANSMISSION: u8 = 0x89;
const LIGHT_LEDS: u8 = 0x13;
const TURN_OFF_LEDS: u8 = 0x11;
const DISABLE_KEYCLICK: u8 = 0x99;
const ENABLE_KEYCLICK_SET_VOLUME: u8 = 0x1B;
const DISABLE_CTRL_KEYCLICK: u8 = 0xB9;
const ENABLE_CTRL_KEYCLICK: u8 = 0xBB;
const SOUND_KEYCLICK: u8 = 0x9F;
const DISABLE_BELL: u8 = 0xA1;
const ENABLE_BELL_SET_VOLUME: u8 = 0x23;
const SOUND_BELL: u8 = 0xA7;
const TEMPORARY_AUTO_REPEAT_INHIBIT: u8 = 0xC1;
const ENABLE_AUTO_REPEAT: u8 = 0xE3;
const DISABLE_AUTO_REPEAT: u8 = 0xE1;
const ALL_AUTO_REPEAT_TO_DOWN_ONLY: u8 = 0xD9;
const REQUEST_KEYBOARD_ID: u8 = 0xAB;
const JUMP_TO_POWER_UP: u8 = 0xFD;
const JUMP_TO_TEST_MODE: u8 = 0xCB;
const REINSTATE_DEFAULTS: u8 = 0xD3;
// The only command honored in test mode.
const TEST_MODE_JUMP_TO_POWER_UP: u8 = 0x80;

/// Wire index marking a repeat-buffer update instead of a mode change.
const REPEAT_BUFFER_UPDATE_INDEX: u8 = 0x0F;

impl<L: HostLink, S: Sounder, P: IndicatorPanel> Engine<L, S, P> {
    /// Executes one complete command frame from the host.
    pub(crate) fn host_event(&mut self, frame: &Frame) {
        let Some(&first) = frame.first() else {
            return;
        };

        if self.test_mode {
            if first == TEST_MODE_JUMP_TO_POWER_UP {
                self.power_up();
            }
            return;
        }

        if first & 0x01 != 0 {
            self.peripheral_command(frame);
        } else {
            self.transmission_command(frame);
        }
    }

    fn peripheral_command(&mut self, frame: &Frame) {
        match frame[0] {
            RESUME_TRANSMISSION => self.resume_transmission(),
            INHIBIT_TRANSMISSION => self.inhibit_transmission(),
            LIGHT_LEDS | TURN_OFF_LEDS => self.switch_leds(frame),
            DISABLE_KEYCLICK => self.beeper.set_keyclick_volume(None),
            ENABLE_KEYCLICK_SET_VOLUME => {
                if let Some(volume) = self.volume_parameter(frame) {
                    self.beeper.set_keyclick_volume(Some(volume));
                }
            }
            DISABLE_CTRL_KEYCLICK => self.ctrl_keyclick = false,
            ENABLE_CTRL_KEYCLICK => self.ctrl_keyclick = true,
            SOUND_KEYCLICK => self.beeper.sound_keyclick(),
            DISABLE_BELL => self.beeper.set_bell_volume(None),
            ENABLE_BELL_SET_VOLUME => {
                if let Some(volume) = self.volume_parameter(frame) {
                    self.beeper.set_bell_volume(Some(volume));
                }
            }
            SOUND_BELL => self.beeper.sound_bell(),
            TEMPORARY_AUTO_REPEAT_INHIBIT => self.inhibit_current_repeat(),
            ENABLE_AUTO_REPEAT => self.metronome.set_enabled(true),
            DISABLE_AUTO_REPEAT => self.metronome.set_enabled(false),
            ALL_AUTO_REPEAT_TO_DOWN_ONLY => self.divisions.demote_auto_repeat(),
            REQUEST_KEYBOARD_ID => {
                self.serial
                    .write(&[codes::KEYBOARD_ID_FIRMWARE, codes::KEYBOARD_ID_HARDWARE]);
            }
            JUMP_TO_POWER_UP => self.power_up(),
            JUMP_TO_TEST_MODE => {
                self.test_mode = true;
                self.serial.write_byte(codes::TEST_MODE_ACK);
            }
            REINSTATE_DEFAULTS => self.reinstate_defaults(),
            unknown => {
                log::debug!("unrecognized peripheral command {unknown:#04x}");
                self.input_error();
            }
        }
    }

    fn resume_transmission(&mut self) {
        self.leds.set(Indicator::Lock, false);
        self.serial.unlock();
        // Replay down codes that never reached the host, newest press first.
        for key in self.keys.newest_first_mut() {
            if !key.sent {
                self.serial.write_byte(key.keycode);
                key.sent = true;
            }
        }
        self.metronome.resend();
    }

    fn inhibit_transmission(&mut self) {
        self.leds.set(Indicator::Lock, true);
        self.serial.write_byte(codes::KBD_LOCKED_ACK);
        self.serial.flush();
        self.serial.lock();
    }

    fn switch_leds(&mut self, frame: &Frame) {
        if frame.len() != 2 {
            self.input_error();
            return;
        }
        let on = frame[0] == LIGHT_LEDS;
        for indicator in Indicator::ALL {
            if frame[1] & indicator.mask() != 0 {
                self.leds.set(indicator, on);
            }
        }
    }

    /// Extracts the volume parameter of a two-byte volume command, emitting
    /// an input error on any other frame size.
    fn volume_parameter(&mut self, frame: &Frame) -> Option<u8> {
        if frame.len() != 2 {
            self.input_error();
            return None;
        }
        Some(frame[1] & 0x07)
    }

    /// Marks the key currently feeding auto-repeat so it stops repeating
    /// for the remainder of this press.
    fn inhibit_current_repeat(&mut self) {
        let divisions = &self.divisions;
        let candidate = self
            .keys
            .newest_first_mut()
            .filter(|key| !key.inhibit_auto_repeat)
            .find(|key| divisions.mode_of(key.keycode) == Some(Mode::AutoRepeat));
        if let Some(key) = candidate {
            key.inhibit_auto_repeat = true;
        }
    }

    fn transmission_command(&mut self, frame: &Frame) {
        let first = frame[0];
        let index = (first >> 3) & 0x0F;

        if index == 0 {
            self.input_error();
            return;
        }
        if index == REPEAT_BUFFER_UPDATE_INDEX {
            self.update_repeat_buffer(frame);
            return;
        }

        if frame.len() > 2 {
            self.input_error();
            return;
        }
        let Ok(mode) = Mode::try_from((first >> 1) & 0x03) else {
            self.input_error();
            return;
        };
        let Some(division) = Division::from_wire_index(index) else {
            self.input_error();
            return;
        };

        let buffer = if mode == Mode::AutoRepeat {
            match frame.get(1) {
                Some(&parameter) => {
                    let buffer = usize::from(parameter & 0x7F);
                    if buffer >= NUM_REPEAT_BUFFERS {
                        self.input_error();
                        return;
                    }
                    buffer
                }
                None => 0,
            }
        } else {
            0
        };

        log::debug!("division {division:?} switched to {mode:?} (buffer {buffer})");
        self.divisions.set(division, DivisionConfig { mode, buffer });
        self.serial.write_byte(codes::MODE_CHANGE_ACK);
        self.metronome.resend();
    }

    fn update_repeat_buffer(&mut self, frame: &Frame) {
        if frame.len() != 3 {
            self.input_error();
            return;
        }
        let buffer = usize::from((frame[0] >> 1) & 0x03);
        let timeout_ms = u32::from(frame[1] & 0x7F) * 5;
        // Metronome codes per second; zero would never fire.
        let rate = u32::from(frame[2] & 0x7F);
        if rate == 0 {
            self.input_error();
            return;
        }

        log::debug!("repeat buffer {buffer}: timeout {timeout_ms} ms, {rate} codes/s");
        self.repeat_buffers.set(
            buffer,
            RepeatBuffer {
                timeout_ms,
                interval_ms: 1000 / rate,
            },
        );
        self.serial.write_byte(codes::MODE_CHANGE_ACK);
        self.metronome.resend();
    }

    pub(crate) fn input_error(&mut self) {
        self.serial.write_byte(codes::INPUT_ERROR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{engine, frame, report};

    #[test]
    fn framer_completes_on_the_high_bit() {
        let mut framer = Framer::new();
        assert_eq!(framer.push(0x13), None);
        let frame = framer.push(0x84).unwrap();
        assert_eq!(frame.as_slice(), [0x13, 0x84]);
    }

    #[test]
    fn framer_passes_single_byte_commands_through() {
        let mut framer = Framer::new();
        let frame = framer.push(0x89).unwrap();
        assert_eq!(frame.as_slice(), [0x89]);
    }

    #[test]
    fn framer_truncates_over_long_frames() {
        let mut framer = Framer::new();
        for byte in [0x01, 0x02, 0x03, 0x04, 0x05] {
            assert_eq!(framer.push(byte), None);
        }
        let frame = framer.push(0x86).unwrap();
        assert_eq!(frame.as_slice(), [0x01, 0x02, 0x03, 0x86]);
        // The framer is clean again afterwards.
        assert_eq!(framer.push(0x89).unwrap().as_slice(), [0x89]);
    }

    #[test]
    fn light_leds_sets_the_requested_indicators() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x13, 0x84]));
        assert!(engine.sent().is_empty());
        assert_eq!(engine.led_state(), [false, false, true, false]);
        engine.host_event(&frame(&[0x13, 0x83]));
        assert_eq!(engine.led_state(), [true, true, true, false]);
        engine.host_event(&frame(&[0x11, 0x86]));
        assert_eq!(engine.led_state(), [true, false, false, false]);
    }

    #[test]
    fn led_commands_validate_their_size() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x13, 0x00, 0x84]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
        assert_eq!(engine.led_state(), [false; 4]);
    }

    #[test]
    fn volume_commands_mask_to_three_bits() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x1B, 0xFF]));
        engine.host_event(&frame(&[0x9F]));
        assert_eq!(engine.last_beep(), Some((7, crate::beeper::KEYCLICK_MS)));
        engine.host_event(&frame(&[0x23, 0x82]));
        engine.host_event(&frame(&[0xA7]));
        assert_eq!(engine.last_beep(), Some((2, crate::beeper::BELL_MS)));
    }

    #[test]
    fn keyclick_and_bell_can_be_disabled() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x99]));
        engine.host_event(&frame(&[0xA1]));
        engine.host_event(&frame(&[0x9F]));
        engine.host_event(&frame(&[0xA7]));
        assert_eq!(engine.beep_count(), 0);
    }

    #[test]
    fn unknown_peripheral_commands_report_input_error() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x8F]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
    }

    #[test]
    fn keyboard_id_request_returns_both_id_bytes() {
        let mut engine = engine();
        engine.host_event(&frame(&[0xAB]));
        assert_eq!(
            engine.sent(),
            [codes::KEYBOARD_ID_FIRMWARE, codes::KEYBOARD_ID_HARDWARE]
        );
    }

    #[test]
    fn mode_change_acknowledges_and_reconfigures() {
        let mut engine = engine();
        // Division 6 (shift and ctrl) to down-only: 1_0110_00_0.
        engine.host_event(&frame(&[0xB0]));
        assert_eq!(engine.sent(), [codes::MODE_CHANGE_ACK]);
        assert_eq!(
            engine.division_config(Division::ShiftAndCtrl).mode,
            Mode::DownOnly
        );
    }

    #[test]
    fn mode_change_with_parameter_selects_the_repeat_buffer() {
        let mut engine = engine();
        // Division 1 to auto-repeat with buffer 2: 0_0001_01_0, 0x82.
        engine.host_event(&frame(&[0x0A, 0x82]));
        assert_eq!(engine.sent(), [codes::MODE_CHANGE_ACK]);
        let config = engine.division_config(Division::MainArray);
        assert_eq!(config.mode, Mode::AutoRepeat);
        assert_eq!(config.buffer, 2);
    }

    #[test]
    fn mode_change_without_parameter_defaults_to_buffer_zero() {
        let mut engine = engine();
        // Division 3 to auto-repeat, single byte form: 1_0011_01_0.
        engine.host_event(&frame(&[0x9A]));
        assert_eq!(engine.sent(), [codes::MODE_CHANGE_ACK]);
        let config = engine.division_config(Division::Delete);
        assert_eq!(config.mode, Mode::AutoRepeat);
        assert_eq!(config.buffer, 0);
    }

    #[test]
    fn division_zero_is_rejected() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x82]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
    }

    #[test]
    fn undefined_mode_bits_are_rejected() {
        let mut engine = engine();
        // Division 1, mode 0b10: 1_0001_10_0.
        engine.host_event(&frame(&[0x8C]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
    }

    #[test]
    fn out_of_range_repeat_buffer_parameter_is_rejected() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x0A, 0x84]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
        assert_eq!(engine.division_config(Division::MainArray).buffer, 0);
    }

    #[test]
    fn repeat_buffer_update_reprograms_the_timing() {
        let mut engine = engine();
        // Buffer 1: 0_1111_01_0, timeout 100 * 5 ms, 25 codes per second.
        engine.host_event(&frame(&[0x7A, 100, 0x80 | 25]));
        assert_eq!(engine.sent(), [codes::MODE_CHANGE_ACK]);
        let timing = engine.repeat_buffer(1);
        assert_eq!(timing.timeout_ms, 500);
        assert_eq!(timing.interval_ms, 40);
    }

    #[test]
    fn repeat_buffer_update_validates_size_and_rate() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x7A, 0x80 | 25]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
        engine.host_event(&frame(&[0x7A, 100, 0x80]));
        assert_eq!(engine.sent(), [codes::INPUT_ERROR]);
        // The buffer keeps its defaults.
        assert_eq!(engine.repeat_buffer(1).timeout_ms, 300);
    }

    #[test]
    fn all_auto_repeat_divisions_demote_to_down_only() {
        let mut engine = engine();
        engine.host_event(&frame(&[0xD9]));
        assert!(engine.sent().is_empty());
        assert_eq!(
            engine.division_config(Division::MainArray).mode,
            Mode::DownOnly
        );
        assert_eq!(
            engine.division_config(Division::SixEditingKeys).mode,
            Mode::DownUp
        );
    }

    #[test]
    fn temporary_inhibit_stops_the_current_candidate_only() {
        let mut engine = engine();
        engine.hid_event(&report(0x00, &[0x04]), 0);
        engine.sent();
        engine.host_event(&frame(&[0xC1]));
        for now in 1..=800 {
            engine.metronome_event(now);
        }
        assert!(engine.sent().is_empty());
        // A new press repeats normally.
        engine.hid_event(&report(0x00, &[0x04, 0x05]), 800);
        engine.sent();
        for now in 801..=1301 {
            engine.metronome_event(now);
        }
        assert_eq!(engine.sent(), [codes::METRONOME]);
    }

    #[test]
    fn inhibit_locks_and_acknowledges() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x89]));
        assert_eq!(engine.sent(), [codes::KBD_LOCKED_ACK]);
        assert!(engine.is_locked());
        assert_eq!(engine.led_state(), [false, false, true, false]);
    }

    #[test]
    fn resume_unlocks_and_clears_the_lock_led() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x89]));
        engine.sent();
        engine.host_event(&frame(&[0x8B]));
        assert!(!engine.is_locked());
        assert_eq!(engine.led_state(), [false; 4]);
    }

    #[test]
    fn test_mode_ignores_everything_but_the_exit_command() {
        let mut engine = engine();
        engine.host_event(&frame(&[0xCB]));
        assert_eq!(engine.sent(), [codes::TEST_MODE_ACK]);
        // Normally-valid commands are ignored without a response.
        engine.host_event(&frame(&[0xAB]));
        engine.host_event(&frame(&[0x13, 0x84]));
        assert!(engine.sent().is_empty());
        assert_eq!(engine.led_state(), [false; 4]);
        // The jump-to-power-up exits and transmits the power-up frame.
        engine.host_event(&frame(&[0x80]));
        assert_eq!(engine.sent(), codes::POWER_UP_TRANSMISSION);
        engine.host_event(&frame(&[0xAB]));
        assert_eq!(engine.sent().len(), 2);
    }

    #[test]
    fn reinstate_defaults_restores_tables_and_peripherals() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x13, 0x8F]));
        engine.host_event(&frame(&[0x0A, 0x82]));
        engine.host_event(&frame(&[0x7A, 100, 0x80 | 25]));
        engine.host_event(&frame(&[0x99]));
        engine.sent();

        engine.host_event(&frame(&[0xD3]));
        assert!(engine.sent().is_empty());
        assert_eq!(engine.division_config(Division::MainArray).buffer, 0);
        assert_eq!(engine.repeat_buffer(1).timeout_ms, 300);
        assert_eq!(engine.led_state(), [false; 4]);
        engine.host_event(&frame(&[0x9F]));
        assert_eq!(
            engine.last_beep(),
            Some((crate::beeper::DEFAULT_VOLUME, crate::beeper::KEYCLICK_MS))
        );
    }

    #[test]
    fn byte_stream_executes_commands_as_frames_complete() {
        let mut engine = engine();
        let mut framer = Framer::new();
        // Inhibit, light two LEDs, resume, as one contiguous byte stream.
        for byte in [0x89, 0x13, 0x83, 0x8B] {
            if let Some(frame) = framer.push(byte) {
                engine.host_event(&frame);
            }
        }
        assert_eq!(engine.sent(), [codes::KBD_LOCKED_ACK]);
        assert_eq!(engine.led_state(), [true, true, false, false]);
        assert!(!engine.is_locked());
    }

    #[test]
    fn jump_to_power_up_reinitializes_and_transmits() {
        let mut engine = engine();
        engine.host_event(&frame(&[0x0A, 0x82]));
        engine.sent();
        engine.host_event(&frame(&[0xFD]));
        assert_eq!(engine.sent(), codes::POWER_UP_TRANSMISSION);
        assert_eq!(engine.division_config(Division::MainArray).buffer, 0);
    }
}
