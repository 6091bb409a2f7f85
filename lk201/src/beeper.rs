//! Keyclick and bell volume state in front of the physical beeper.

/// Keyclick length in milliseconds.
pub const KEYCLICK_MS: u32 = 2;
/// Bell length in milliseconds.
pub const BELL_MS: u32 = 125;
/// Volume applied to both sounds at power-up. Volumes run from 0 (loudest)
/// to 7 (softest).
pub const DEFAULT_VOLUME: u8 = 2;

/// Drives the physical beeper output.
pub trait Sounder {
    /// Starts a square wave at the given volume (0 loudest, 7 softest) and
    /// turns it off again after `duration_ms`. A new beep restarts the
    /// off-timer.
    fn beep(&mut self, volume: u8, duration_ms: u32);
}

/// The keyboard's two sounds, each with a host-programmable volume or
/// disabled entirely.
pub struct Beeper<S> {
    sounder: S,
    keyclick_volume: Option<u8>,
    bell_volume: Option<u8>,
}

impl<S: Sounder> Beeper<S> {
    /// Wraps a sounder with both volumes at the power-up default.
    pub fn new(sounder: S) -> Self {
        Self {
            sounder,
            keyclick_volume: Some(DEFAULT_VOLUME),
            bell_volume: Some(DEFAULT_VOLUME),
        }
    }

    /// Restores the power-up volumes.
    pub fn reset(&mut self) {
        self.keyclick_volume = Some(DEFAULT_VOLUME);
        self.bell_volume = Some(DEFAULT_VOLUME);
    }

    /// Sets the keyclick volume; `None` disables the keyclick.
    pub fn set_keyclick_volume(&mut self, volume: Option<u8>) {
        self.keyclick_volume = volume;
    }

    /// Sets the bell volume; `None` disables the bell.
    pub fn set_bell_volume(&mut self, volume: Option<u8>) {
        self.bell_volume = volume;
    }

    /// Plays one keyclick, unless the keyclick is disabled.
    pub fn sound_keyclick(&mut self) {
        if let Some(volume) = self.keyclick_volume {
            self.sounder.beep(volume, KEYCLICK_MS);
        }
    }

    /// Plays one bell, unless the bell is disabled.
    pub fn sound_bell(&mut self) {
        if let Some(volume) = self.bell_volume {
            self.sounder.beep(volume, BELL_MS);
        }
    }
}

#[cfg(test)]
impl<S> Beeper<S> {
    pub(crate) fn sounder(&self) -> &S {
        &self.sounder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockSounder;

    #[test]
    fn keyclick_uses_the_default_volume() {
        let mut beeper = Beeper::new(MockSounder::default());
        beeper.sound_keyclick();
        assert_eq!(beeper.sounder.beeps, [(DEFAULT_VOLUME, KEYCLICK_MS)]);
    }

    #[test]
    fn disabled_sounds_stay_silent() {
        let mut beeper = Beeper::new(MockSounder::default());
        beeper.set_keyclick_volume(None);
        beeper.set_bell_volume(None);
        beeper.sound_keyclick();
        beeper.sound_bell();
        assert!(beeper.sounder.beeps.is_empty());
    }

    #[test]
    fn volumes_are_programmable_and_reset_restores_them() {
        let mut beeper = Beeper::new(MockSounder::default());
        beeper.set_bell_volume(Some(7));
        beeper.sound_bell();
        beeper.reset();
        beeper.sound_bell();
        assert_eq!(
            beeper.sounder.beeps,
            [(7, BELL_MS), (DEFAULT_VOLUME, BELL_MS)]
        );
    }
}
