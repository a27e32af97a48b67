//! Hardware capabilities consumed by the core.
//!
//! The core never touches registers. Each board provides implementations
//! of these traits; host tests provide mocks.
//!
//! # `no_std` Compatibility
//!
//! All implementations must be `#![no_std]` compatible with no heap allocation.

/// Error type for endpoint writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Endpoint still holds the previous report (or is not configured).
    NotReady,
    /// USB I/O error.
    Io,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::NotReady => f.write_str("endpoint not ready"),
            TransportError::Io => f.write_str("endpoint I/O error"),
        }
    }
}

/// Bank of button inputs.
pub trait ButtonInputs {
    /// Raw pin levels, bit n = button n. Buttons are active-low.
    fn levels(&self) -> u16;
}

/// Bank of LED outputs.
///
/// Takes `&self` because the LEDs are driven from both the main loop and the
/// control-transfer context; implementations provide their own exclusion.
pub trait LedOutputs {
    /// Drive LED n from bit n (1 = on).
    fn set(&self, mask: u16);

    /// Drive the LEDs from `mask` unless `host_owns` returns true, without a
    /// host write landing between the check and the update.
    ///
    /// Returns whether the LEDs were driven. The default is only correct
    /// when nothing else drives the LEDs concurrently; shared banks override
    /// it to run both steps under their lock.
    fn mirror_unless<F: FnOnce() -> bool>(&self, mask: u16, host_owns: F) -> bool {
        if host_owns() {
            return false;
        }
        self.set(mask);
        true
    }
}

/// Free-running hardware counter (quadrature position).
pub trait Counter {
    /// Current count. Only the low byte is meaningful to the core.
    fn count(&self) -> u32;
}

impl<C: Counter + ?Sized> Counter for &C {
    #[inline]
    fn count(&self) -> u32 {
        (**self).count()
    }
}

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since boot. Wraps after ~49 days.
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Packet transport for the interrupt IN endpoints.
pub trait Transport {
    /// Check if endpoint `ep` (address with direction bit) can take a report.
    fn ep_ready(&self, ep: u8) -> bool;

    /// Queue one report on endpoint `ep`.
    fn write(&mut self, ep: u8, data: &[u8]) -> Result<(), TransportError>;
}

/// Warm reset hand-off.
pub trait ResetControl {
    /// Persist `reason` across a warm reset and reset the chip.
    fn request_warm_reset(&mut self, reason: u32);
}
