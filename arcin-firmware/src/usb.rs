//! USB device stack for the composite gamepad + keyboard.
//!
//! `embassy-usb` runs enumeration and the control pipe. Interface-level
//! requests reach the HID functions through [`UsbControl`], and the device
//! and configuration descriptors are registered from `arcin_core` so the
//! bytes on the wire match its tables.

use arcin_core::config::CONTROL_BUFFER_SIZE;
use arcin_core::hid::{GamepadFunction, KeyboardFunction};
use arcin_core::{add_hid_interface, hex_str, serial_hex, usb_config, ControlDispatcher, ControlFlags, UsbControl};
use defmt::{info, unwrap};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;

use crate::board::{MonotonicClock, SharedLeds};

pub type UsbDriver = Driver<'static, USB>;
pub type ReportEndpoint = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;

/// Pending report for one IN endpoint.
pub type ReportSlot = arcin_core::ReportSlot<CriticalSectionRawMutex>;

/// Transport handed to the main loop.
pub type SlotTransport = arcin_core::SlotTransport<'static, CriticalSectionRawMutex>;

pub type BoardGamepad = GamepadFunction<'static, SharedLeds, MonotonicClock>;

static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; CONTROL_BUFFER_SIZE]> = StaticCell::new();
static SERIAL: StaticCell<[u8; 8]> = StaticCell::new();
static CONTROL: StaticCell<UsbControl<'static>> = StaticCell::new();

/// Built device plus the two interrupt IN endpoints.
pub struct UsbHid {
    pub device: UsbDevice<'static, UsbDriver>,
    pub gamepad: ReportEndpoint,
    pub keyboard: ReportEndpoint,
}

/// Build the composite device. Must be called exactly once.
pub fn init(
    driver: UsbDriver,
    serial: u32,
    flags: &'static ControlFlags,
    gamepad: &'static mut BoardGamepad,
    keyboard: &'static mut KeyboardFunction,
) -> UsbHid {
    let serial_text = hex_str(SERIAL.init(serial_hex(serial)));
    info!("USB serial number {}", serial_text);

    let mut builder = Builder::new(
        driver,
        usb_config(serial_text),
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; CONTROL_BUFFER_SIZE]),
    );

    // Interface order is gamepad (0), keyboard (1).
    let gamepad_ep = add_hid_interface(&mut builder, gamepad);
    let keyboard_ep = add_hid_interface(&mut builder, keyboard);

    let mut dispatcher = ControlDispatcher::new(serial);
    unwrap!(dispatcher.register(gamepad));
    unwrap!(dispatcher.register(keyboard));
    builder.handler(CONTROL.init(UsbControl::new(dispatcher, flags)));

    let device = builder.build();
    info!("USB composite device built (gamepad + keyboard)");

    UsbHid {
        device,
        gamepad: gamepad_ep,
        keyboard: keyboard_ep,
    }
}
