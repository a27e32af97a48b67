//! Flags shared between the control-transfer context and the main loop.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Write-once/read-poll cells set by control handling and read by the main loop.
///
/// Every cell is a single-word atomic; no lock is involved, so the control
/// path may run from interrupt context.
#[derive(Debug)]
pub struct ControlFlags {
    reset_request: AtomicBool,
    last_led_update: AtomicU32,
    configured: AtomicBool,
}

impl ControlFlags {
    /// Create cleared flags. The LED timestamp starts at 0 ms.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reset_request: AtomicBool::new(false),
            last_led_update: AtomicU32::new(0),
            configured: AtomicBool::new(false),
        }
    }

    /// Track SET_CONFIGURATION, bus reset and power loss.
    #[inline]
    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Release);
    }

    /// Host has selected the configuration; the interrupt endpoints are live.
    #[inline]
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// Ask the main loop to hand off to the bootloader.
    #[inline]
    pub fn request_reset(&self) {
        self.reset_request.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn reset_requested(&self) -> bool {
        self.reset_request.load(Ordering::Acquire)
    }

    /// Record a host LED write at `now_ms`.
    #[inline]
    pub fn record_led_update(&self, now_ms: u32) {
        self.last_led_update.store(now_ms, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn last_led_update(&self) -> u32 {
        self.last_led_update.load(Ordering::Acquire)
    }

    /// True when the host has written the LEDs within `window_ms` of `now_ms`.
    #[inline]
    #[must_use]
    pub fn host_owns_leds(&self, now_ms: u32, window_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_led_update()) <= window_ms
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_flag() {
        let flags = ControlFlags::new();
        assert!(!flags.reset_requested());
        flags.request_reset();
        assert!(flags.reset_requested());
    }

    #[test]
    fn test_configured_flag() {
        let flags = ControlFlags::new();
        assert!(!flags.is_configured());
        flags.set_configured(true);
        assert!(flags.is_configured());
        flags.set_configured(false);
        assert!(!flags.is_configured());
    }

    #[test]
    fn test_host_led_window() {
        let flags = ControlFlags::new();
        flags.record_led_update(5000);
        assert!(flags.host_owns_leds(5000, 1000));
        assert!(flags.host_owns_leds(6000, 1000));
        assert!(!flags.host_owns_leds(6001, 1000));
    }

    #[test]
    fn test_host_led_window_across_clock_wrap() {
        let flags = ControlFlags::new();
        flags.record_led_update(u32::MAX - 10);
        assert!(flags.host_owns_leds(100, 1000));
        assert!(!flags.host_owns_leds(1000, 1000));
    }
}
