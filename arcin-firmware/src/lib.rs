//! arcin controller firmware for RP2040.
//!
//! Board bring-up and USB plumbing around [`arcin_core`].
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) and:
//! 1. Samples 11 buttons and decodes two quadrature encoders
//! 2. Enumerates as a composite gamepad + keyboard HID device
//! 3. Mirrors the buttons onto 11 LEDs unless the host drives them
//! 4. Hands off to the ROM bootloader when the host sends the reset feature
//!
//! # Hardware Configuration
//!
//! | Function     | GPIO   | Description |
//! |--------------|--------|-------------|
//! | Buttons      | 0-10   | Active-low, internal pull-ups |
//! | LEDs         | 11-21  | Active-high |
//! | Encoder 1    | 22, 26 | Quadrature A/B |
//! | Encoder 2    | 27, 28 | Quadrature A/B |
//! | Status LED   | 25     | On while running |
//!
//! # Architecture
//!
//! All tasks share the thread executor.
//!
//! - **USB task**: `embassy-usb` enumeration and the control pipe, handing
//!   interface requests to the HID functions
//! - **Report writer tasks**: one per IN endpoint, sending the latest report
//!   from a [`ReportSlot`]
//! - **Encoder tasks**: edge-driven quadrature decoding into shared counters
//! - **Main loop**: [`ReportComposer`](arcin_core::ReportComposer) once per
//!   pass, yielding in between
//!
//! # Modules
//!
//! - [`board`]: Pin banks, LEDs, clock, unique ID and bootloader reset
//! - [`usb`]: Composite device setup ([`usb::init`]) and report transport ([`SlotTransport`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub use arcin_core;

pub mod board;
pub mod usb;

pub use board::{track_quadrature, unique_id, BootloaderReset, MonotonicClock, PinBank, SharedLeds};
pub use usb::{ReportEndpoint, ReportSlot, SlotTransport, UsbHid};
