//! Platform-agnostic core of the arcin controller firmware.
//!
//! The controller enumerates as a composite USB HID device with two
//! interfaces: a gamepad (11 buttons, two encoder axes, 11 host-addressable
//! LEDs, and a feature byte that hands off to the bootloader) and a
//! keyboard that mirrors the same inputs as scan codes. This crate holds
//! everything that does not touch hardware, so it runs unchanged on the
//! device and on the host for testing.
//!
//! # Overview
//!
//! - [`descriptor`]: Device, configuration, HID and string descriptors
//! - [`control`]: Setup packet model and the [`ControlDispatcher`]
//! - [`hid`]: HID class requests ([`HidFunction`]) and the two report handlers
//! - [`encoder`]: Encoder debounce state machine ([`AnalogEncoder`])
//! - [`quadrature`]: Software quadrature decoding into a shared counter
//! - [`composer`]: Main-loop iteration ([`ReportComposer`])
//! - [`flags`]: Flags shared between control handling and the main loop
//! - [`hal`]: Hardware traits implemented by each board
//! - `usb`: `embassy-usb` registration, control handler and report slots
//!   (feature `usb`)
//! - [`types`]: Report and input types ([`Buttons`], [`Direction`], ...)
//! - [`config`]: Compile-time constants
//!
//! # Data flow
//!
//! ```text
//! pins/counters -> AnalogEncoder -> ReportComposer -> Transport -> host
//! host -> UsbControl -> ControlDispatcher -> HidFunction -> ControlFlags/LEDs -> ReportComposer
//! ```
//!
//! # Example
//!
//! ```rust
//! use arcin_core::{compose_keyboard, Buttons, Direction};
//!
//! // Button 0 and start held, encoder 1 turning forward.
//! let report = compose_keyboard(Buttons(0x201), Direction::Forward, Direction::Idle);
//! assert_eq!(&report.as_bytes()[..3], &[0x04u8, 0x28, 0x1a]);
//! ```
//!
//! # Features
//!
//! - **`usb`** (default): `embassy-usb` integration ([`usb::UsbControl`],
//!   [`usb::SlotTransport`], builder registration)
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod composer;
pub mod config;
pub mod control;
pub mod descriptor;
pub mod encoder;
pub mod flags;
pub mod hal;
pub mod hid;
pub mod quadrature;
pub mod types;
#[cfg(feature = "usb")]
pub mod usb;

// Re-export main types at crate root
pub use composer::{compose_keyboard, Iteration, ReportComposer};
pub use control::{
    ClassDriver, ControlDispatcher, ControlError, ControlResponse, SetupPacket, SetupStatus,
};
pub use descriptor::{hex_str, serial_hex, serial_number, DescriptorError, ReportLayout};
pub use encoder::AnalogEncoder;
pub use flags::ControlFlags;
pub use hal::{ButtonInputs, Clock, Counter, LedOutputs, ResetControl, Transport, TransportError};
pub use hid::{
    gamepad_function, keyboard_function, GamepadHandler, HidFunction, KeyboardHandler,
    ReportError, ReportHandler,
};
pub use quadrature::{QuadratureDecoder, SharedCounter};
pub use types::{Buttons, Direction, GamepadReport, KeyboardReport};
#[cfg(feature = "usb")]
pub use usb::{add_hid_interface, send_reports, usb_config, ReportSlot, SlotTransport, UsbControl};
