//! Core report types: Buttons, Direction, GamepadReport, KeyboardReport.

use crate::config::{BUTTON_COUNT, BUTTON_MASK};
use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Button state represented as a bitfield.
///
/// Bit *n* is button *n* (active-high). The same bit layout is used for the
/// LED bank, so a button mask can be mirrored onto the LEDs unchanged.
///
/// # Example
///
/// ```
/// use arcin_core::Buttons;
///
/// let buttons = Buttons::from_active_low(0x7fe);
/// assert!(buttons.is_pressed(0));
/// assert!(!buttons.is_pressed(1));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const START: Self = Self(1 << 9);
    pub const SELECT: Self = Self(1 << 10);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Build a mask from raw pin levels of pulled-up, switch-to-ground inputs.
    ///
    /// Bits above [`BUTTON_COUNT`] are discarded.
    #[inline]
    #[must_use]
    pub const fn from_active_low(levels: u16) -> Self {
        Self(!levels & BUTTON_MASK)
    }

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if button `index` is pressed.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, index: usize) -> bool {
        index < BUTTON_COUNT && self.0 & (1 << index) != 0
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// Debounced encoder output.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Reverse,
    #[default]
    Idle,
    Forward,
}

impl Direction {
    /// Signed representation: -1, 0 or 1.
    #[inline]
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Direction::Reverse => -1,
            Direction::Idle => 0,
            Direction::Forward => 1,
        }
    }

    /// The opposite direction. Idle stays idle.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Reverse => Direction::Forward,
            Direction::Idle => Direction::Idle,
            Direction::Forward => Direction::Reverse,
        }
    }

    /// Pick the scan code for this direction from a `(reverse, forward)` pair.
    #[inline]
    #[must_use]
    pub const fn scan_code(self, codes: (u8, u8)) -> Option<u8> {
        match self {
            Direction::Reverse => Some(codes.0),
            Direction::Idle => None,
            Direction::Forward => Some(codes.1),
        }
    }
}

/// Gamepad IN report.
///
/// Wire layout (4 bytes, little-endian, packed):
/// ```text
/// Byte 0-1: button mask (bit n = button n)
/// Byte 2:   X axis (encoder 1 counter low byte)
/// Byte 3:   Y axis (encoder 2 counter low byte)
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    pub buttons: Buttons,
    pub axis_x: u8,
    pub axis_y: u8,
}

impl GamepadReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 4;

    /// Convert the report to bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let buttons = self.buttons.raw().to_le_bytes();
        [buttons[0], buttons[1], self.axis_x, self.axis_y]
    }
}

/// Keyboard IN report: an array of scan codes, zero-filled after the last
/// pressed key.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    keys: [u8; Self::SIZE],
    len: usize,
}

impl KeyboardReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 13;

    /// An all-keys-released report.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            keys: [0; Self::SIZE],
            len: 0,
        }
    }

    /// Append a scan code. Codes past the last slot are dropped.
    pub fn press(&mut self, code: u8) {
        if let Some(slot) = self.keys.get_mut(self.len) {
            *slot = code;
            self.len += 1;
        }
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.keys
    }
}
