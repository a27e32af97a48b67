//! Software quadrature decoding into a free-running counter.
//!
//! Boards without a hardware quadrature timer sample the two encoder phases
//! on every edge and feed them through [`QuadratureDecoder`]; the resulting
//! steps accumulate in a [`SharedCounter`] that the debounce logic reads like
//! a hardware counter.

use crate::hal::Counter;
use portable_atomic::{AtomicU32, Ordering};

/// Step for every `(previous << 2) | current` phase transition.
///
/// Phases are encoded as `(a << 1) | b`. Forward is 00 → 10 → 11 → 01;
/// a transition that skips a state (both phases changed) is dropped.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Gray-code state tracker for one encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureDecoder {
    phase: u8,
}

impl QuadratureDecoder {
    /// Start from the given phase levels.
    #[must_use]
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            phase: Self::encode(a, b),
        }
    }

    #[inline]
    const fn encode(a: bool, b: bool) -> u8 {
        ((a as u8) << 1) | b as u8
    }

    /// Feed new phase levels; returns -1, 0 or 1.
    pub fn update(&mut self, a: bool, b: bool) -> i8 {
        let phase = Self::encode(a, b);
        let step = TRANSITIONS[((self.phase << 2) | phase) as usize];
        self.phase = phase;
        step
    }
}

/// Counter written by a single decoder context and read by the main loop.
#[derive(Debug)]
pub struct SharedCounter(AtomicU32);

impl SharedCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Apply a signed step, wrapping. Single writer only.
    #[inline]
    pub fn step(&self, step: i8) {
        let value = self.0.load(Ordering::Relaxed);
        self.0
            .store(value.wrapping_add(step as i32 as u32), Ordering::Relaxed);
    }
}

impl Default for SharedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter for SharedCounter {
    #[inline]
    fn count(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}
