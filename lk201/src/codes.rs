//! LK201 wire codes: the special bytes the keyboard transmits, keyboard
//! identification, and the HID-usage to keycode translation table.

/// Keyboard ID, firmware half. First byte of the power-up transmission.
pub const KEYBOARD_ID_FIRMWARE: u8 = 0x01;
/// Keyboard ID, hardware half. Second byte of the power-up transmission.
pub const KEYBOARD_ID_HARDWARE: u8 = 0x00;

/// A key was found down during the power-up self-test.
pub const KEY_DOWN_ON_POWER_UP_ERROR: u8 = 0x3D;
/// The power-up self-test failed.
pub const POWER_UP_SELF_TEST_ERROR: u8 = 0x3E;

/// A down/up key was released and no other down/up key remains pressed.
pub const ALL_UPS: u8 = 0xB3;
/// An auto-repeat interval has passed with a key held down.
pub const METRONOME: u8 = 0xB4;
/// The transmit buffer overflowed while the keyboard was inhibited.
pub const OUTPUT_ERROR: u8 = 0xB5;
/// The host sent an invalid command or parameters.
pub const INPUT_ERROR: u8 = 0xB6;
/// The keyboard received the inhibit-transmission command.
pub const KBD_LOCKED_ACK: u8 = 0xB7;
/// The keyboard has entered test mode.
pub const TEST_MODE_ACK: u8 = 0xB8;
/// The next byte is the keycode of a key held down in a division that
/// changed to down/up mode.
pub const PREFIX_TO_KEYS_DOWN: u8 = 0xB9;
/// The keyboard has processed a mode-change command.
pub const MODE_CHANGE_ACK: u8 = 0xBA;
/// Reserved; never a valid keycode.
pub const RESERVED: u8 = 0x7F;

/// Keycode of either Shift key.
pub const SHIFT: u8 = 0xAE;
/// Keycode of the Ctrl key.
pub const CTRL: u8 = 0xAF;

/// The four bytes sent after power-up and on a jump-to-power-up command:
/// keyboard ID, then the self-test error slot (0x00 on pass), then the
/// keycode of a key stuck down during self-test (0x00 when none).
///
/// This implementation has no self-test to fail and no matrix to find a
/// stuck key in, so the two trailing slots always report a pass.
pub const POWER_UP_TRANSMISSION: [u8; 4] =
    [KEYBOARD_ID_FIRMWARE, KEYBOARD_ID_HARDWARE, 0x00, 0x00];

/// Translates a HID keyboard usage ID into an LK201 keycode.
///
/// Usages with no LK201 counterpart translate to `0x00`, which the keyboard
/// translator discards.
#[must_use]
pub fn keycode_for_hid(usage: u8) -> u8 {
    HID_TO_KEYCODE[usize::from(usage)]
}

/// HID usage page 0x07 (keyboard/keypad) to LK201 keycode.
///
/// Letters, digits and punctuation follow the LK201 main-array chart; the
/// PC-only keys borrow the closest LK201 key (Escape and F11 share a code,
/// Backspace maps to the LK201 Delete key, the nav cluster maps to the six
/// editing keys, Alt maps to Compose). Entries of 0x00 have no mapping.
#[rustfmt::skip]
static HID_TO_KEYCODE: [u8; 256] = [
    // 0x00: no event, rollover, POST fail, undefined
    0x00, 0x00, 0x00, 0x00,
    // 0x04: a b c d e f g h i j k l
    0xC2, 0xD9, 0xCE, 0xCD, 0xCC, 0xD2, 0xD8, 0xDD, 0xE6, 0xE2, 0xE7, 0xEC,
    // 0x10: m n o p q r s t u v w x
    0xE3, 0xDE, 0xEB, 0xF0, 0xC1, 0xD1, 0xC7, 0xD7, 0xE1, 0xD3, 0xC6, 0xC8,
    // 0x1C: y z
    0xDC, 0xC3,
    // 0x1E: 1 2 3 4 5 6 7 8 9 0
    0xC0, 0xC5, 0xCB, 0xD0, 0xD6, 0xDB, 0xE0, 0xE5, 0xEA, 0xEF,
    // 0x28: Return, Escape (F11 sends ESC), Backspace (LK201 Delete), Tab,
    //       Space, - =
    0xBD, 0x71, 0xBC, 0xBE, 0xD4, 0xF9, 0xF5,
    // 0x2F: [ ] \ and the non-US # (same key as backslash on the LK201)
    0xFA, 0xF6, 0xF7, 0xF7,
    // 0x33: ; ' ` , . /
    0xF2, 0xFB, 0xBF, 0xE8, 0xED, 0xF3,
    // 0x39: Caps Lock
    0xB0,
    // 0x3A: F1-F10
    0x56, 0x57, 0x58, 0x59, 0x5A, 0x64, 0x65, 0x66, 0x67, 0x68,
    // 0x44: F11 F12, Print Screen (F13), Scroll Lock (F14), Pause (Help)
    0x71, 0x72, 0x73, 0x74, 0x7C,
    // 0x49: Insert (Insert Here), Home (Find), Page Up (Prev Screen),
    //       Delete (Remove), End (Select), Page Down (Next Screen)
    0x8B, 0x8A, 0x8E, 0x8C, 0x8D, 0x8F,
    // 0x4F: Right Left Down Up
    0xA8, 0xA7, 0xA9, 0xAA,
    // 0x53: Num Lock (PF1), KP/ (PF2), KP* (PF3), KP- (PF4), KP+ (KP comma)
    0xA1, 0xA2, 0xA3, 0xA4, 0x9C,
    // 0x58: KP Enter, KP1-KP9
    0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F,
    // 0x62: KP0, KP., non-US backslash (the LK201 < > key), Application (Do)
    0x92, 0x94, 0xC9, 0x7D,
    // 0x66: Power, KP=
    0x00, 0x00,
    // 0x68: F13 F14 F15 F16 F17-F20
    0x73, 0x74, 0x00, 0x00, 0x80, 0x81, 0x82, 0x83,
    // 0x70: F21-F24, Execute, Help, Menu (Do), Select
    0x00, 0x00, 0x00, 0x00, 0x00, 0x7C, 0x7D, 0x8D,
    // 0x78: Stop, Again, Undo, Cut, Copy, Paste, Find, Mute
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x8A, 0x00,
    // 0x80-0xDF: volume, locking keys, international and language keys
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // 0xE0: LCtrl, LShift, LAlt (Compose), LGUI
    0xAF, 0xAE, 0xB1, 0x00,
    // 0xE4: RCtrl, RShift, RAlt (Compose), RGUI
    0xAF, 0xAE, 0xB1, 0x00,
    // 0xE8-0xFF: unassigned
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];
