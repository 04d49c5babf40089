//! Hardware abstraction traits for keypad, encoder, battery, and time.
//!
//! This module defines the physical-input interfaces that allow the
//! controller core to run across platforms (ESP32 hardware, desktop mocks).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`KeypadInput`] | Debounced 12-key keypad events |
//! | [`EncoderInput`] | Rotary encoder for speed/character selection |
//! | [`BatteryMonitor`] | Smoothed battery percentage and alerts |
//! | [`Clock`] | Time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. Hardware ports implement these over their
//! platform's debouncing/ADC libraries; the core never touches pins.

/// A key on the 12-key keypad.
///
/// Digits plus the two shifted keys. `*` opens a multi-digit menu command
/// (or deletes a character in entry modes); `#` commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    /// Digit key `0`–`9`.
    Digit(u8),
    /// The `*` key.
    Star,
    /// The `#` key.
    Hash,
}

impl Key {
    /// Map an ASCII keypad character to a [`Key`].
    ///
    /// # Examples
    ///
    /// ```
    /// use wit_throttle::traits::Key;
    ///
    /// assert_eq!(Key::from_char('7'), Some(Key::Digit(7)));
    /// assert_eq!(Key::from_char('*'), Some(Key::Star));
    /// assert_eq!(Key::from_char('#'), Some(Key::Hash));
    /// assert_eq!(Key::from_char('x'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Key::Digit(c as u8 - b'0')),
            '*' => Some(Key::Star),
            '#' => Some(Key::Hash),
            _ => None,
        }
    }

    /// The digit value if this is a digit key.
    pub fn digit(&self) -> Option<u8> {
        match self {
            Key::Digit(d) => Some(*d),
            _ => None,
        }
    }
}

/// Phase of a key event as reported by the debouncing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyPhase {
    /// Key went down.
    Press,
    /// Key came back up.
    Release,
    /// Key held past the hold threshold.
    Hold,
}

/// A single debounced keypad event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyEvent {
    /// Which key.
    pub key: Key,
    /// Press, release, or hold.
    pub phase: KeyPhase,
}

impl KeyEvent {
    /// Convenience constructor for a press event.
    pub fn press(key: Key) -> Self {
        Self {
            key,
            phase: KeyPhase::Press,
        }
    }
}

/// Keypad input trait.
///
/// Abstracts a debounced matrix keypad. The underlying library handles
/// scanning and debouncing; the core only consumes discrete events.
///
/// # Implementation Notes
///
/// - `poll_event()` must be non-blocking; return `None` when no event is
///   pending.
/// - Events should be delivered in press order; the core processes at
///   most a handful per tick.
pub trait KeypadInput {
    /// Return the next pending key event, if any.
    fn poll_event(&mut self) -> Option<KeyEvent>;
}

/// Rotary encoder input trait.
///
/// Abstracts a rotary encoder with push button. In operation mode the
/// delta drives speed; in entry modes it cycles characters.
///
/// # Implementation Notes
///
/// - `read_delta()` should return accumulated clicks and reset the counter
/// - Positive values = clockwise rotation (speed increase)
/// - The button is typically used for e-stop or a mode-specific confirm
pub trait EncoderInput {
    /// Returns delta clicks since last call (positive = clockwise).
    ///
    /// This should reset the internal counter after reading.
    fn read_delta(&mut self) -> i32;

    /// Returns true if the encoder button is currently pressed.
    fn button_pressed(&self) -> bool;

    /// Returns true if button was just pressed (edge detection).
    ///
    /// Default implementation just returns `button_pressed()`.
    /// Override for proper edge detection.
    fn button_just_pressed(&mut self) -> bool {
        self.button_pressed()
    }
}

/// Battery monitor trait.
///
/// The sampling, smoothing, and voltage conversion live behind this
/// trait; the core only consumes a percentage and alert flags for the
/// status line and battery indicator.
pub trait BatteryMonitor {
    /// Battery charge in percent, 0–100.
    fn percentage(&self) -> u8;

    /// True below the low-battery threshold (typically 15%).
    fn is_low(&self) -> bool;

    /// True below the critical threshold (typically 5%).
    fn is_critical(&self) -> bool;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for heartbeat, reconnect, and
/// status-decay timing. On desktop, wrap `std::time::Instant`. On
/// embedded, use the system millisecond counter; all comparisons in the
/// core use wrapping subtraction so counter wraparound is safe.
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_char_digits() {
        for d in 0..=9u8 {
            let c = (b'0' + d) as char;
            assert_eq!(Key::from_char(c), Some(Key::Digit(d)));
        }
    }

    #[test]
    fn key_from_char_specials() {
        assert_eq!(Key::from_char('*'), Some(Key::Star));
        assert_eq!(Key::from_char('#'), Some(Key::Hash));
        assert_eq!(Key::from_char('A'), None);
        assert_eq!(Key::from_char(' '), None);
    }

    #[test]
    fn key_digit_accessor() {
        assert_eq!(Key::Digit(5).digit(), Some(5));
        assert_eq!(Key::Star.digit(), None);
        assert_eq!(Key::Hash.digit(), None);
    }

    struct TestEncoder {
        button_state: bool,
    }

    impl EncoderInput for TestEncoder {
        fn read_delta(&mut self) -> i32 {
            0
        }

        fn button_pressed(&self) -> bool {
            self.button_state
        }
    }

    #[test]
    fn encoder_button_just_pressed_default_impl() {
        let mut encoder = TestEncoder {
            button_state: false,
        };

        // Default implementation just mirrors the current state
        assert!(!encoder.button_just_pressed());
        encoder.button_state = true;
        assert!(encoder.button_just_pressed());
        assert!(encoder.button_just_pressed());
    }
}
