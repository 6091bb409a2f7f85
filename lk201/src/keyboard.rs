//! HID report translation: edge detection against the previous report and
//! per-division down/up emission.

use heapless::Vec;

use crate::beeper::Sounder;
use crate::codes;
use crate::division::Mode;
use crate::engine::Engine;
use crate::leds::IndicatorPanel;
use crate::serial::HostLink;

/// Size of a boot-protocol keyboard report.
pub const HID_REPORT_SIZE: usize = 8;
/// Offset of the first key slot in a report.
pub const HID_REPORT_FIRST_KEY: usize = 2;
/// How many simultaneously pressed keys the keyboard tracks.
pub const MAX_KEYS_DOWN: usize = 16;

/// Bookkeeping for one currently pressed key.
#[derive(Debug, Clone, Copy)]
pub struct KeyDown {
    /// The LK201 keycode.
    pub keycode: u8,
    /// Milliseconds since boot when the press was seen.
    pub pressed_at: u64,
    /// Whether auto-repeat has begun for this press.
    pub repeating: bool,
    /// Whether the down code actually reached the host. False only when the
    /// keyboard was inhibited with a full holding buffer; resume replays
    /// these.
    pub sent: bool,
    /// Set by the host's temporary auto-repeat inhibit command.
    pub inhibit_auto_repeat: bool,
}

/// The set of currently pressed keys, newest press first.
///
/// Keycodes are non-zero and unique; capacity is [`MAX_KEYS_DOWN`].
#[derive(Debug, Default)]
pub struct KeysDown(Vec<KeyDown, MAX_KEYS_DOWN>);

impl KeysDown {
    /// Whether the set is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    /// Whether a keycode is currently down.
    #[must_use]
    pub fn contains(&self, keycode: u8) -> bool {
        self.0.iter().any(|key| key.keycode == keycode)
    }

    /// Records a new press. The caller checks capacity and uniqueness first.
    pub fn press(&mut self, entry: KeyDown) {
        // Storage order is oldest first; iteration reverses it.
        let _ = self.0.push(entry);
    }

    /// Removes a press, returning its entry if it was present.
    pub fn release(&mut self, keycode: u8) -> Option<KeyDown> {
        let index = self.0.iter().position(|key| key.keycode == keycode)?;
        Some(self.0.remove(index))
    }

    /// Iterates entries from the most recent press to the oldest.
    pub fn newest_first(&self) -> impl Iterator<Item = &KeyDown> {
        self.0.iter().rev()
    }

    /// Iterates entries mutably from the most recent press to the oldest.
    pub fn newest_first_mut(&mut self) -> impl Iterator<Item = &mut KeyDown> {
        self.0.iter_mut().rev()
    }

    /// Finds the entry for a keycode.
    pub fn find_mut(&mut self, keycode: u8) -> Option<&mut KeyDown> {
        self.0.iter_mut().find(|key| key.keycode == keycode)
    }
}

fn in_key_slots(usage: u8, report: &[u8; HID_REPORT_SIZE]) -> bool {
    report[HID_REPORT_FIRST_KEY..].contains(&usage)
}

impl<L: HostLink, S: Sounder, P: IndicatorPanel> Engine<L, S, P> {
    /// Translates one HID report into LK201 traffic.
    ///
    /// Modifier edges are handled before key-slot edges, so a report that
    /// both presses Shift and a letter transmits Shift first. Releases of
    /// down/up keys are collected and transmitted after everything else:
    /// newest queued first, or a single all-ups code when no down/up key
    /// remains pressed.
    pub(crate) fn hid_event(&mut self, report: &[u8; HID_REPORT_SIZE], now: u64) {
        let mut released_down_ups: Vec<u8, MAX_KEYS_DOWN> = Vec::new();

        let this_modifiers = report[0];
        let last_modifiers = self.last_report[0];
        for bit in 0..8u8 {
            let keycode = match bit {
                0 | 4 => codes::CTRL,
                1 | 5 => codes::SHIFT,
                _ => continue,
            };
            let mask = 1 << bit;
            if this_modifiers & mask != 0 && last_modifiers & mask == 0 {
                self.key_down(keycode, now);
            }
            if last_modifiers & mask != 0 && this_modifiers & mask == 0 {
                self.key_up(keycode, &mut released_down_ups);
            }
        }

        for slot in HID_REPORT_FIRST_KEY..HID_REPORT_SIZE {
            let usage = report[slot];
            if usage != 0x00 && !in_key_slots(usage, &self.last_report) {
                self.key_down(codes::keycode_for_hid(usage), now);
            }
            let previous = self.last_report[slot];
            if previous != 0x00 && !in_key_slots(previous, report) {
                self.key_up(codes::keycode_for_hid(previous), &mut released_down_ups);
            }
        }

        self.last_report = *report;

        self.send_down_up_releases(&released_down_ups);
    }

    fn key_down(&mut self, keycode: u8, now: u64) {
        if keycode == 0x00 || self.keys.contains(keycode) {
            return;
        }
        if self.keys.is_full() {
            log::warn!("key table full, dropping keycode {keycode:#04x}");
            return;
        }

        let sent = self.serial.write_byte(keycode);
        self.keys.press(KeyDown {
            keycode,
            pressed_at: now,
            repeating: false,
            sent,
            inhibit_auto_repeat: false,
        });

        if sent {
            self.keyclick();
        }

        self.metronome.resend();
    }

    fn key_up(&mut self, keycode: u8, released_down_ups: &mut Vec<u8, MAX_KEYS_DOWN>) {
        if keycode == 0x00 {
            return;
        }
        let _ = self.keys.release(keycode);

        if self.divisions.mode_of(keycode) == Some(Mode::DownUp) {
            let _ = released_down_ups.push(keycode);
        }
    }

    fn send_down_up_releases(&mut self, released_down_ups: &[u8]) {
        if released_down_ups.is_empty() {
            return;
        }

        let divisions = &self.divisions;
        let any_down_up_left = self
            .keys
            .newest_first()
            .any(|key| divisions.mode_of(key.keycode) == Some(Mode::DownUp));

        if any_down_up_left {
            for &keycode in released_down_ups.iter().rev() {
                self.serial.write_byte(keycode);
                self.metronome.resend();
            }
        } else {
            self.serial.write_byte(codes::ALL_UPS);
            self.metronome.resend();
        }
    }

    /// Plays the keyclick for a transmitted down code, honoring the host's
    /// ctrl-keyclick setting.
    fn keyclick(&mut self) {
        if !self.ctrl_keyclick && self.keys.contains(codes::CTRL) {
            return;
        }
        self.beeper.sound_keyclick();
    }
}
