//! Key divisions: the fourteen LK201 key groups, their transmission modes,
//! and the four auto-repeat timing buffers.

use num_enum::TryFromPrimitive;

/// Number of key divisions on an LK201.
pub const NUM_DIVISIONS: usize = 14;
/// Number of auto-repeat timing buffers.
pub const NUM_REPEAT_BUFFERS: usize = 4;

/// Per-division transmission policy, with the on-wire encoding of the
/// mode-change command (bits 2..1 of the command byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Mode {
    /// A press transmits a single down code; the release is silent.
    DownOnly = 0b00,
    /// A press transmits a down code and then repeats on the metronome
    /// while held.
    AutoRepeat = 0b01,
    /// A press transmits a down code and the release transmits an up code.
    DownUp = 0b11,
}

/// One of the fourteen logical key groups sharing a transmission mode.
///
/// Discriminants are one less than the division index used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Division {
    /// Letters, digits and punctuation.
    MainArray = 0,
    /// The numeric keypad.
    Keypad = 1,
    /// The delete key.
    Delete = 2,
    /// Return and tab.
    ReturnAndTab = 3,
    /// Lock and compose.
    LockAndCompose = 4,
    /// Shift and ctrl.
    ShiftAndCtrl = 5,
    /// Left and right cursor keys.
    HorizontalCursors = 6,
    /// Up and down cursor keys.
    VerticalCursors = 7,
    /// The six editing keys above the cursors.
    SixEditingKeys = 8,
    /// Function key group F1-F5.
    FunctionKeys1 = 9,
    /// Function key group F6-F10.
    FunctionKeys2 = 10,
    /// Function key group F11-F14.
    FunctionKeys3 = 11,
    /// Function key group Help and Do.
    FunctionKeys4 = 12,
    /// Function key group F17-F20.
    FunctionKeys5 = 13,
}

impl Division {
    /// Classifies an LK201 keycode into its division.
    ///
    /// Returns `None` for bytes outside the keycode space (including the
    /// special transmitted codes 0xB3-0xBA).
    #[must_use]
    pub fn from_keycode(keycode: u8) -> Option<Self> {
        match keycode {
            0x56..=0x62 => Some(Self::FunctionKeys1),
            0x63..=0x6E => Some(Self::FunctionKeys2),
            0x6F..=0x7A => Some(Self::FunctionKeys3),
            0x7B..=0x7D => Some(Self::FunctionKeys4),
            0x7E..=0x87 => Some(Self::FunctionKeys5),
            0x88..=0x90 => Some(Self::SixEditingKeys),
            0x91..=0xA5 => Some(Self::Keypad),
            0xA6..=0xA8 => Some(Self::HorizontalCursors),
            0xA9..=0xAC => Some(Self::VerticalCursors),
            0xAD..=0xAF => Some(Self::ShiftAndCtrl),
            0xB0..=0xB2 => Some(Self::LockAndCompose),
            0xBC => Some(Self::Delete),
            0xBD | 0xBE => Some(Self::ReturnAndTab),
            0xBF..=0xFF => Some(Self::MainArray),
            _ => None,
        }
    }

    /// Looks up a division from the 1-based index used in mode-change
    /// commands.
    #[must_use]
    pub fn from_wire_index(index: u8) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::try_from(i).ok())
    }

    #[must_use]
    pub(crate) fn index(self) -> usize {
        usize::from(self as u8)
    }
}

/// Mode and, for auto-repeating divisions, the repeat buffer in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionConfig {
    /// Transmission mode.
    pub mode: Mode,
    /// Index of the repeat buffer; only meaningful in auto-repeat mode.
    pub buffer: usize,
}

impl DivisionConfig {
    const fn auto_repeat(buffer: usize) -> Self {
        Self {
            mode: Mode::AutoRepeat,
            buffer,
        }
    }

    const fn down_only() -> Self {
        Self {
            mode: Mode::DownOnly,
            buffer: 0,
        }
    }

    const fn down_up() -> Self {
        Self {
            mode: Mode::DownUp,
            buffer: 0,
        }
    }
}

const DIVISION_DEFAULTS: [DivisionConfig; NUM_DIVISIONS] = [
    DivisionConfig::auto_repeat(0), // Main array
    DivisionConfig::auto_repeat(0), // Keypad
    DivisionConfig::auto_repeat(1), // Delete
    DivisionConfig::down_only(),    // Return and tab
    DivisionConfig::down_only(),    // Lock and compose
    DivisionConfig::down_up(),      // Shift and ctrl
    DivisionConfig::auto_repeat(1), // Horizontal cursors
    DivisionConfig::auto_repeat(1), // Vertical cursors
    DivisionConfig::down_up(),      // Six editing keys
    DivisionConfig::down_up(),      // Function keys 1
    DivisionConfig::down_up(),      // Function keys 2
    DivisionConfig::down_up(),      // Function keys 3
    DivisionConfig::down_up(),      // Function keys 4
    DivisionConfig::down_up(),      // Function keys 5
];

/// The mutable mode table for all fourteen divisions.
#[derive(Debug, Clone)]
pub struct Divisions([DivisionConfig; NUM_DIVISIONS]);

impl Default for Divisions {
    fn default() -> Self {
        Self(DIVISION_DEFAULTS)
    }
}

impl Divisions {
    /// Restores the power-up defaults.
    pub fn reset(&mut self) {
        self.0 = DIVISION_DEFAULTS;
    }

    /// Returns the configuration of a division.
    #[must_use]
    pub fn get(&self, division: Division) -> DivisionConfig {
        self.0[division.index()]
    }

    /// Replaces the configuration of a division.
    pub fn set(&mut self, division: Division, config: DivisionConfig) {
        self.0[division.index()] = config;
    }

    /// Returns the transmission mode governing a keycode, if the byte is a
    /// real keycode.
    #[must_use]
    pub fn mode_of(&self, keycode: u8) -> Option<Mode> {
        Division::from_keycode(keycode).map(|division| self.get(division).mode)
    }

    /// Switches every auto-repeating division to down-only mode.
    pub fn demote_auto_repeat(&mut self) {
        for config in &mut self.0 {
            if config.mode == Mode::AutoRepeat {
                config.mode = Mode::DownOnly;
            }
        }
    }
}

/// Timing for one auto-repeat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatBuffer {
    /// Milliseconds a key must stay down before auto-repeat begins.
    pub timeout_ms: u32,
    /// Milliseconds between repeat transmissions.
    pub interval_ms: u32,
}

const REPEAT_BUFFER_DEFAULTS: [RepeatBuffer; NUM_REPEAT_BUFFERS] = [
    RepeatBuffer {
        timeout_ms: 500,
        interval_ms: 1000 / 30,
    },
    RepeatBuffer {
        timeout_ms: 300,
        interval_ms: 1000 / 30,
    },
    RepeatBuffer {
        timeout_ms: 500,
        interval_ms: 1000 / 40,
    },
    RepeatBuffer {
        timeout_ms: 300,
        interval_ms: 1000 / 40,
    },
];

/// The four host-programmable auto-repeat timing buffers.
#[derive(Debug, Clone)]
pub struct RepeatBuffers([RepeatBuffer; NUM_REPEAT_BUFFERS]);

impl Default for RepeatBuffers {
    fn default() -> Self {
        Self(REPEAT_BUFFER_DEFAULTS)
    }
}

impl RepeatBuffers {
    /// Restores the power-up defaults.
    pub fn reset(&mut self) {
        self.0 = REPEAT_BUFFER_DEFAULTS;
    }

    /// Returns the timing of a buffer. Out-of-range indexes fall back to
    /// buffer 0; callers validate indexes at the protocol boundary.
    #[must_use]
    pub fn get(&self, buffer: usize) -> RepeatBuffer {
        self.0.get(buffer).copied().unwrap_or(self.0[0])
    }

    /// Reprograms a buffer. Out-of-range indexes are ignored.
    pub fn set(&mut self, buffer: usize, timing: RepeatBuffer) {
        if let Some(slot) = self.0.get_mut(buffer) {
            *slot = timing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_covers_every_keycode_range() {
        let expected = [
            (0x56, 0x62, Division::FunctionKeys1),
            (0x63, 0x6E, Division::FunctionKeys2),
            (0x6F, 0x7A, Division::FunctionKeys3),
            (0x7B, 0x7D, Division::FunctionKeys4),
            (0x7E, 0x87, Division::FunctionKeys5),
            (0x88, 0x90, Division::SixEditingKeys),
            (0x91, 0xA5, Division::Keypad),
            (0xA6, 0xA8, Division::HorizontalCursors),
            (0xA9, 0xAC, Division::VerticalCursors),
            (0xAD, 0xAF, Division::ShiftAndCtrl),
            (0xB0, 0xB2, Division::LockAndCompose),
            (0xBC, 0xBC, Division::Delete),
            (0xBD, 0xBE, Division::ReturnAndTab),
            (0xBF, 0xFF, Division::MainArray),
        ];
        for (first, last, division) in expected {
            for keycode in first..=last {
                assert_eq!(
                    Division::from_keycode(keycode),
                    Some(division),
                    "keycode {keycode:#04x}"
                );
            }
        }
    }

    #[test]
    fn special_bytes_have_no_division() {
        for keycode in [0x00, 0x55, 0xB3, 0xB5, 0xBA, 0xBB] {
            assert_eq!(Division::from_keycode(keycode), None);
        }
    }

    #[test]
    fn wire_index_is_one_based() {
        assert_eq!(Division::from_wire_index(0), None);
        assert_eq!(Division::from_wire_index(1), Some(Division::MainArray));
        assert_eq!(Division::from_wire_index(14), Some(Division::FunctionKeys5));
        assert_eq!(Division::from_wire_index(15), None);
    }

    #[test]
    fn defaults_match_the_lk201_power_up_state() {
        let divisions = Divisions::default();
        assert_eq!(
            divisions.get(Division::MainArray),
            DivisionConfig::auto_repeat(0)
        );
        assert_eq!(
            divisions.get(Division::Delete),
            DivisionConfig::auto_repeat(1)
        );
        assert_eq!(
            divisions.get(Division::ReturnAndTab).mode,
            Mode::DownOnly
        );
        assert_eq!(divisions.get(Division::ShiftAndCtrl).mode, Mode::DownUp);
        assert_eq!(
            divisions.get(Division::VerticalCursors),
            DivisionConfig::auto_repeat(1)
        );
        assert_eq!(divisions.get(Division::FunctionKeys5).mode, Mode::DownUp);

        let buffers = RepeatBuffers::default();
        assert_eq!(buffers.get(0).timeout_ms, 500);
        assert_eq!(buffers.get(0).interval_ms, 33);
        assert_eq!(buffers.get(1).timeout_ms, 300);
        assert_eq!(buffers.get(2).interval_ms, 25);
        assert_eq!(buffers.get(3).timeout_ms, 300);
    }

    #[test]
    fn demote_auto_repeat_leaves_other_modes_alone() {
        let mut divisions = Divisions::default();
        divisions.demote_auto_repeat();
        assert_eq!(divisions.get(Division::MainArray).mode, Mode::DownOnly);
        assert_eq!(divisions.get(Division::Keypad).mode, Mode::DownOnly);
        assert_eq!(divisions.get(Division::ShiftAndCtrl).mode, Mode::DownUp);
        assert_eq!(divisions.get(Division::FunctionKeys1).mode, Mode::DownUp);
        assert_eq!(divisions.get(Division::ReturnAndTab).mode, Mode::DownOnly);
    }
}
