//! The 1 ms metronome driving auto-repeat.

use crate::beeper::Sounder;
use crate::codes;
use crate::division::Mode;
use crate::engine::Engine;
use crate::leds::IndicatorPanel;
use crate::serial::HostLink;

/// Auto-repeat progress between ticks.
#[derive(Debug)]
pub(crate) struct Metronome {
    enabled: bool,
    /// Keycode currently repeating; 0 when none.
    repeating_keycode: u8,
    /// Timestamp at which the next repeat is due.
    next_at: u64,
    /// Set when another code was transmitted since the last repeat; the
    /// next repeat then re-sends the keycode itself instead of the generic
    /// metronome byte.
    resend: bool,
}

impl Metronome {
    pub(crate) fn new() -> Self {
        Self {
            enabled: true,
            repeating_keycode: 0,
            next_at: 0,
            resend: false,
        }
    }

    /// Flags that unrelated traffic interleaved with the repeat stream.
    pub(crate) fn resend(&mut self) {
        self.resend = true;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Restores the power-up state.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<L: HostLink, S: Sounder, P: IndicatorPanel> Engine<L, S, P> {
    /// Advances auto-repeat by one tick.
    pub(crate) fn metronome_event(&mut self, now: u64) {
        let Some(candidate) = self.repeat_candidate() else {
            self.metronome.repeating_keycode = 0;
            self.metronome.resend = false;
            return;
        };

        let timing = self.repeat_buffers.get(candidate.buffer);

        if self.metronome.repeating_keycode != candidate.keycode {
            // A different key is taking over the repeat stream.
            if now.saturating_sub(candidate.pressed_at) > u64::from(timing.timeout_ms) {
                if candidate.repeating && self.metronome.repeating_keycode != 0 {
                    self.emit_repeat(candidate.keycode);
                } else {
                    self.emit_repeat(codes::METRONOME);
                }
                self.metronome.repeating_keycode = candidate.keycode;
                self.metronome.next_at = now + u64::from(timing.interval_ms);
                self.metronome.resend = false;
                if let Some(entry) = self.keys.find_mut(candidate.keycode) {
                    entry.repeating = true;
                }
            }
            return;
        }

        if now >= self.metronome.next_at {
            self.metronome.next_at += u64::from(timing.interval_ms);
            if self.metronome.resend {
                self.metronome.resend = false;
                self.emit_repeat(candidate.keycode);
            } else {
                self.emit_repeat(codes::METRONOME);
            }
        }
    }

    /// The newest pressed key eligible for auto-repeat.
    fn repeat_candidate(&self) -> Option<RepeatCandidate> {
        let divisions = &self.divisions;
        self.keys
            .newest_first()
            .filter(|key| !key.inhibit_auto_repeat)
            .find_map(|key| {
                let division = crate::division::Division::from_keycode(key.keycode)?;
                let config = divisions.get(division);
                (config.mode == Mode::AutoRepeat).then_some(RepeatCandidate {
                    keycode: key.keycode,
                    pressed_at: key.pressed_at,
                    repeating: key.repeating,
                    buffer: config.buffer,
                })
            })
    }

    /// Transmits a repeat byte, unless the host disabled auto-repeat; the
    /// repeat state advances either way so re-enabling resumes cleanly.
    fn emit_repeat(&mut self, byte: u8) {
        if !self.metronome.enabled {
            return;
        }
        if self.serial.write_byte(byte) {
            self.beeper.sound_keyclick();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RepeatCandidate {
    keycode: u8,
    pressed_at: u64,
    repeating: bool,
    buffer: usize,
}
