//! Serial output toward the host with LK201-style flow control.
//!
//! The host may inhibit keyboard transmission at any time. While inhibited,
//! up to four bytes are held back in submission order; anything beyond that
//! is dropped and surfaced as a single `OUTPUT_ERROR` when transmission
//! resumes.

use heapless::Vec;

use crate::codes;

/// Blocking byte transport toward the host UART.
///
/// Implementations accept every byte passed to [`HostLink::send`], blocking
/// the caller until the transmit hardware has buffered them. The engine
/// relies on this: a send on an unlocked [`SerialOutput`] never loses data.
pub trait HostLink {
    /// Queues bytes for transmission, blocking until all are accepted.
    fn send(&mut self, bytes: &[u8]);

    /// Blocks until every queued byte has left the transmitter.
    fn flush(&mut self);
}

/// Bytes held back while transmission is inhibited.
const HOLD_CAPACITY: usize = 4;

/// Flow-controlled writer for the LK201 wire.
pub struct SerialOutput<L> {
    pub(crate) link: L,
    locked: bool,
    overflow: bool,
    held: Vec<u8, HOLD_CAPACITY>,
}

impl<L: HostLink> SerialOutput<L> {
    /// Wraps a host link; transmission starts out uninhibited.
    pub fn new(link: L) -> Self {
        Self {
            link,
            locked: false,
            overflow: false,
            held: Vec::new(),
        }
    }

    /// Writes one byte.
    ///
    /// Returns whether the byte was accepted: always `true` while unlocked
    /// (the link blocks until it fits), `false` once the holding buffer is
    /// full while locked, in which case the overflow flag is raised.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        if self.locked {
            if self.held.push(byte).is_err() {
                self.overflow = true;
                return false;
            }
            return true;
        }
        self.link.send(&[byte]);
        true
    }

    /// Writes a run of bytes, returning how many were accepted.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if self.locked {
            let mut written = 0;
            for &byte in bytes {
                if self.held.push(byte).is_err() {
                    self.overflow = true;
                    break;
                }
                written += 1;
            }
            return written;
        }
        self.link.send(bytes);
        bytes.len()
    }

    /// Blocks until the transmitter has drained.
    pub fn flush(&mut self) {
        self.link.flush();
    }

    /// Inhibits transmission. Idempotent; the first lock clears the holding
    /// buffer and the overflow flag.
    pub fn lock(&mut self) {
        if !self.locked {
            self.locked = true;
            self.held.clear();
            self.overflow = false;
        }
    }

    /// Resumes transmission: the held bytes go out in submission order,
    /// followed by one `OUTPUT_ERROR` if any byte was dropped meanwhile.
    pub fn unlock(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;
        let mut out: Vec<u8, { HOLD_CAPACITY + 1 }> = Vec::new();
        out.extend(self.held.iter().copied());
        if self.overflow {
            // Cannot fail: held is at most HOLD_CAPACITY bytes.
            let _ = out.push(codes::OUTPUT_ERROR);
        }
        self.held.clear();
        self.overflow = false;
        if !out.is_empty() {
            self.link.send(&out);
        }
    }

    /// Forgets all flow-control state without transmitting anything. Held
    /// bytes are dropped silently; used when the keyboard re-initializes.
    pub fn reset(&mut self) {
        self.locked = false;
        self.overflow = false;
        self.held.clear();
    }

    /// Whether transmission is currently inhibited.
    #[must_use]
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Whether a byte has been dropped since the last lock.
    #[must_use]
    pub fn overflow(&self) -> bool {
        self.overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockLink;

    fn output() -> SerialOutput<MockLink> {
        SerialOutput::new(MockLink::default())
    }

    #[test]
    fn unlocked_writes_pass_through() {
        let mut serial = output();
        assert!(serial.write_byte(0xC2));
        assert_eq!(serial.write(&[0x01, 0x02]), 2);
        assert_eq!(serial.link.take(), [0xC2, 0x01, 0x02]);
        assert!(!serial.overflow());
    }

    #[test]
    fn locked_writes_are_held_back() {
        let mut serial = output();
        serial.lock();
        assert!(serial.write_byte(0x10));
        assert!(serial.write_byte(0x20));
        assert!(serial.link.take().is_empty());
        serial.unlock();
        assert_eq!(serial.link.take(), [0x10, 0x20]);
    }

    #[test]
    fn fifth_byte_sets_overflow() {
        let mut serial = output();
        serial.lock();
        for byte in 1..=4 {
            assert!(serial.write_byte(byte));
        }
        assert!(!serial.overflow());
        assert!(!serial.write_byte(5));
        assert!(serial.overflow());
    }

    #[test]
    fn unlock_reports_overflow_after_held_bytes() {
        let mut serial = output();
        serial.lock();
        assert_eq!(serial.write(&[1, 2, 3, 4, 5, 6]), 4);
        serial.unlock();
        assert_eq!(serial.link.take(), [1, 2, 3, 4, codes::OUTPUT_ERROR]);
        assert!(!serial.overflow());
    }

    #[test]
    fn lock_clears_previous_overflow() {
        let mut serial = output();
        serial.lock();
        assert_eq!(serial.write(&[0; 5]), 4);
        assert!(serial.overflow());
        serial.unlock();
        serial.link.take();
        serial.lock();
        assert!(!serial.overflow());
        serial.unlock();
        assert!(serial.link.take().is_empty());
    }

    #[test]
    fn locking_twice_does_not_discard_held_bytes() {
        let mut serial = output();
        serial.lock();
        serial.write_byte(0x42);
        serial.lock();
        serial.unlock();
        assert_eq!(serial.link.take(), [0x42]);
    }

    #[test]
    fn reset_drops_everything_silently() {
        let mut serial = output();
        serial.lock();
        assert_eq!(serial.write(&[1, 2, 3, 4, 5]), 4);
        serial.reset();
        assert!(!serial.locked());
        assert!(!serial.overflow());
        serial.write_byte(0x99);
        assert_eq!(serial.link.take(), [0x99]);
    }
}
