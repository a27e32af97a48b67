//! RP2040 implementations of the core hardware traits.
//!
//! # Pins
//!
//! | Function       | GPIO        |
//! |----------------|-------------|
//! | Buttons 0-10   | 0-10        |
//! | LEDs 0-10      | 11-21       |
//! | Encoder 1 A/B  | 22, 26      |
//! | Encoder 2 A/B  | 27, 28      |
//! | Status LED     | 25          |

use core::cell::RefCell;

use arcin_core::config::BUTTON_COUNT;
use arcin_core::{ButtonInputs, Clock, LedOutputs, QuadratureDecoder, ResetControl, SharedCounter};
use defmt::{info, warn};
use embassy_futures::select::select;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Level, Output};
use embassy_rp::peripherals::FLASH;
use embassy_rp::watchdog::Watchdog;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

/// On-board flash size (W25Q16 on the Pico).
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Watchdog scratch register holding the reset reason.
const RESET_REASON_SCRATCH: usize = 0;

/// Active-low button inputs.
pub struct PinBank {
    pins: [Input<'static>; BUTTON_COUNT],
}

impl PinBank {
    pub fn new(pins: [Input<'static>; BUTTON_COUNT]) -> Self {
        Self { pins }
    }
}

impl ButtonInputs for PinBank {
    fn levels(&self) -> u16 {
        self.pins
            .iter()
            .enumerate()
            .fold(0, |levels, (index, pin)| levels | ((pin.is_high() as u16) << index))
    }
}

/// LED outputs shared by the main loop and the control task.
pub struct SharedLeds {
    leds: Mutex<CriticalSectionRawMutex, RefCell<[Output<'static>; BUTTON_COUNT]>>,
}

impl SharedLeds {
    pub fn new(leds: [Output<'static>; BUTTON_COUNT]) -> Self {
        Self {
            leds: Mutex::new(RefCell::new(leds)),
        }
    }
}

impl LedOutputs for SharedLeds {
    fn set(&self, mask: u16) {
        self.leds.lock(|leds| drive(&mut leds.borrow_mut(), mask));
    }

    fn mirror_unless<F: FnOnce() -> bool>(&self, mask: u16, host_owns: F) -> bool {
        // A host write from the USB task waits for the lock, so it lands
        // either before the check or after the mirror.
        self.leds.lock(|leds| {
            if host_owns() {
                return false;
            }
            drive(&mut leds.borrow_mut(), mask);
            true
        })
    }
}

fn drive(leds: &mut [Output<'static>; BUTTON_COUNT], mask: u16) {
    for (index, led) in leds.iter_mut().enumerate() {
        led.set_level(Level::from(mask & (1 << index) != 0));
    }
}

/// Milliseconds since boot from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap the core expects.
        Instant::now().as_millis() as u32
    }
}

/// Warm reset into the ROM USB bootloader.
pub struct BootloaderReset {
    watchdog: Watchdog,
}

impl BootloaderReset {
    pub fn new(watchdog: Watchdog) -> Self {
        Self { watchdog }
    }
}

impl ResetControl for BootloaderReset {
    fn request_warm_reset(&mut self, reason: u32) {
        info!("Entering bootloader (reason {=u32:#x})", reason);
        self.watchdog.set_scratch(RESET_REASON_SCRATCH, reason);
        // SAFETY: ROM routine, does not return.
        unsafe {
            embassy_rp::rom_data::reset_to_usb_boot(0, 0);
        }
    }
}

/// The three unique-ID words the serial number is derived from: the two
/// halves of the flash unique ID and the SYSINFO chip ID.
pub fn unique_id(flash: &mut Flash<'_, FLASH, Blocking, FLASH_SIZE>) -> [u32; 3] {
    let mut uid = [0u8; 8];
    if let Err(e) = flash.blocking_unique_id(&mut uid) {
        warn!("Flash unique ID unavailable: {:?}", e);
    }
    let chip_id = embassy_rp::pac::SYSINFO.chip_id().read().0;
    [
        u32::from_le_bytes([uid[0], uid[1], uid[2], uid[3]]),
        u32::from_le_bytes([uid[4], uid[5], uid[6], uid[7]]),
        chip_id,
    ]
}

/// Decode one encoder's phases into `counter`, forever.
pub async fn track_quadrature<P>(mut a: P, mut b: P, counter: &SharedCounter) -> !
where
    P: InputPin + Wait,
{
    let mut decoder = QuadratureDecoder::new(level(&mut a), level(&mut b));
    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;
        counter.step(decoder.update(level(&mut a), level(&mut b)));
    }
}

#[inline]
fn level<P: InputPin>(pin: &mut P) -> bool {
    pin.is_high().unwrap_or(false)
}
