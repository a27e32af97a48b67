//! Debounce state machine turning a free-running quadrature counter into a
//! ternary direction (reverse / idle / forward).
//!
//! Each poll compares the counter's low byte against a stored center:
//!
//! - movement of at least `deadzone` ticks recentres and reports a
//!   direction, holding it for `sustain_ms` after the last movement;
//! - with no movement, the direction decays to idle once that window has
//!   passed;
//! - with `clear_on_reverse`, a reversal is reported as one idle poll first,
//!   and the new direction on the next poll.
//!
//! The counter free-runs, so all arithmetic is modulo 256.

use crate::hal::Counter;
use crate::types::Direction;

/// Signed distance from `center` to `observed`, wrapping modulo 256.
#[inline]
#[must_use]
pub const fn wrapping_delta(observed: u8, center: u8) -> i8 {
    observed.wrapping_sub(center) as i8
}

/// Direction implied by a counter delta.
///
/// A `deadzone` of 0 classifies every non-negative delta as forward.
#[inline]
#[must_use]
pub const fn classify(delta: i8, deadzone: u8) -> Direction {
    let delta = delta as i16;
    let deadzone = deadzone as i16;
    if delta >= deadzone {
        Direction::Forward
    } else if delta <= -deadzone {
        Direction::Reverse
    } else {
        Direction::Idle
    }
}

/// `true` once `now` has reached `deadline`, tolerating clock wrap.
#[inline]
pub(crate) const fn deadline_reached(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) as i32 >= 0
}

/// Debounced view of one rotary encoder.
#[derive(Debug)]
pub struct AnalogEncoder<C> {
    counter: C,
    deadzone: u8,
    sustain_ms: u32,
    clear_on_reverse: bool,
    /// Counter position motion is measured from.
    center: u8,
    /// Decay deadline; `None` when disarmed.
    timeout_at: Option<u32>,
    state: Direction,
    last_delta: i8,
}

impl<C: Counter> AnalogEncoder<C> {
    /// Bind a debouncer to `counter`, centred on its current position.
    pub fn new(counter: C, deadzone: u8, sustain_ms: u32, clear_on_reverse: bool) -> Self {
        let center = counter.count() as u8;
        Self {
            counter,
            deadzone,
            sustain_ms,
            clear_on_reverse,
            center,
            timeout_at: None,
            state: Direction::Idle,
            last_delta: 0,
        }
    }

    /// Sample the counter at `now_ms` and return the debounced direction.
    pub fn poll(&mut self, now_ms: u32) -> Direction {
        let observed = self.raw();
        let delta = wrapping_delta(observed, self.center);
        self.last_delta = delta;

        let direction = classify(delta, self.deadzone);

        if direction != Direction::Idle {
            self.center = observed;
            self.timeout_at = Some(now_ms.wrapping_add(self.sustain_ms));
        } else if let Some(deadline) = self.timeout_at {
            if deadline_reached(now_ms, deadline) {
                self.state = Direction::Idle;
                self.center = observed;
                self.timeout_at = None;
            }
        }

        if direction != Direction::Idle {
            let reversing = self.state != Direction::Idle && direction == self.state.opposite();
            self.state = direction;
            if reversing && self.clear_on_reverse {
                return Direction::Idle;
            }
        }

        self.state
    }

    /// Low byte of the underlying counter, as reported on the gamepad axes.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> u8 {
        self.counter.count() as u8
    }

    /// Last latched direction (ignores reversal suppression).
    #[inline]
    #[must_use]
    pub fn state(&self) -> Direction {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> u8 {
        self.center
    }

    /// Delta computed by the most recent poll.
    #[inline]
    #[must_use]
    pub fn last_delta(&self) -> i8 {
        self.last_delta
    }

    #[inline]
    #[must_use]
    pub fn timeout_at(&self) -> Option<u32> {
        self.timeout_at
    }
}
