//! Protocol engine that makes a modern HID keyboard look like a DEC LK201.
//!
//! The engine consumes three event sources — 8-byte HID boot-protocol
//! reports, command frames from the host terminal, and a 1 ms metronome
//! tick — and produces the LK201 byte stream, honoring per-division
//! transmission modes, auto-repeat timing, and LK201 flow control.
//!
//! Hardware stays behind three small traits ([`serial::HostLink`],
//! [`beeper::Sounder`], [`leds::IndicatorPanel`]), so the engine itself is
//! deterministic: callers feed it events together with a timestamp in
//! milliseconds since boot, and it never blocks on anything but the host
//! link.

#![cfg_attr(not(test), no_std)]

pub mod beeper;
pub mod codes;
pub mod division;
pub mod engine;
pub mod host;
pub mod keyboard;
pub mod leds;
mod metronome;
pub mod serial;

pub use engine::{Engine, Event};
pub use host::{Frame, Framer};

#[cfg(test)]
mod testutil;
