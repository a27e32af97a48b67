//! HID function driver and the two report handlers (gamepad, keyboard).
//!
//! A [`HidFunction`] answers the HID class requests for one interface and
//! hands SET_REPORT payloads to its [`ReportHandler`]. The handlers differ
//! only in what they do with output and feature reports.

use crate::config::{
    BUTTON_MASK, FEATURE_NOP, FEATURE_RESET_BOOTLOADER, GAMEPAD_ENDPOINT, GAMEPAD_INTERFACE,
    HID_SPEC_RELEASE, KEYBOARD_ENDPOINT, KEYBOARD_INTERFACE,
};
use crate::control::{
    ClassDriver, ControlResponse, Recipient, RequestKind, SetupPacket, SetupStatus,
    REQUEST_GET_DESCRIPTOR,
};
use crate::descriptor::{
    HidDescriptor, DESCRIPTOR_HID, DESCRIPTOR_REPORT, GAMEPAD_REPORT_DESCRIPTOR,
    KEYBOARD_REPORT_DESCRIPTOR,
};
use crate::flags::ControlFlags;
use crate::hal::{Clock, LedOutputs};

// HID class requests (HID 1.11 section 7.2)
pub const HID_GET_REPORT: u8 = 0x01;
pub const HID_GET_IDLE: u8 = 0x02;
pub const HID_GET_PROTOCOL: u8 = 0x03;
pub const HID_SET_REPORT: u8 = 0x09;
pub const HID_SET_IDLE: u8 = 0x0A;
pub const HID_SET_PROTOCOL: u8 = 0x0B;

/// Report type carried in the high byte of `wValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

impl ReportType {
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(ReportType::Input),
            2 => Some(ReportType::Output),
            3 => Some(ReportType::Feature),
            _ => None,
        }
    }
}

/// Error type for rejected host-to-device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// Payload has the wrong length.
    Length,
    /// Feature command byte not recognised.
    UnknownCommand(u8),
    /// This interface does not accept that report type.
    Unsupported,
}

impl core::fmt::Display for ReportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReportError::Length => f.write_str("report has the wrong length"),
            ReportError::UnknownCommand(cmd) => write!(f, "unknown feature command {cmd:#04x}"),
            ReportError::Unsupported => f.write_str("report type not supported"),
        }
    }
}

/// Per-interface behaviour for host-to-device reports.
pub trait ReportHandler {
    /// Host wrote an OUTPUT report.
    fn set_output_report(&mut self, data: &[u8]) -> Result<(), ReportError>;

    /// Host wrote a FEATURE report.
    fn set_feature_report(&mut self, data: &[u8]) -> Result<(), ReportError>;
}

/// One HID interface with its interrupt IN endpoint.
pub struct HidFunction<H> {
    interface: u8,
    endpoint: u8,
    report_descriptor: &'static [u8],
    hid_descriptor: [u8; HidDescriptor::LEN],
    idle: u8,
    protocol: u8,
    handler: H,
}

impl<H: ReportHandler> HidFunction<H> {
    pub fn new(interface: u8, endpoint: u8, report_descriptor: &'static [u8], handler: H) -> Self {
        let hid_descriptor = HidDescriptor {
            hid_release: HID_SPEC_RELEASE,
            country_code: 0,
            report_length: report_descriptor.len() as u16,
        }
        .to_bytes();
        Self {
            interface,
            endpoint,
            report_descriptor,
            hid_descriptor,
            idle: 0,
            protocol: 1, // report protocol
            handler,
        }
    }

    #[inline]
    #[must_use]
    pub fn interface(&self) -> u8 {
        self.interface
    }

    /// IN endpoint address.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> u8 {
        self.endpoint
    }

    /// Idle rate set by the host, in 4 ms units.
    #[inline]
    #[must_use]
    pub fn idle(&self) -> u8 {
        self.idle
    }

    #[inline]
    #[must_use]
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// HID class descriptor, as embedded in the configuration descriptor.
    #[inline]
    #[must_use]
    pub fn hid_descriptor(&self) -> &[u8; HidDescriptor::LEN] {
        &self.hid_descriptor
    }

    fn standard_request(&mut self, setup: &SetupPacket, response: &mut ControlResponse) -> SetupStatus {
        if !setup.is_in() || setup.request != REQUEST_GET_DESCRIPTOR {
            return SetupStatus::Unhandled;
        }
        let written = match setup.value_high() {
            DESCRIPTOR_REPORT => response.write(self.report_descriptor),
            DESCRIPTOR_HID => response.write(&self.hid_descriptor),
            _ => return SetupStatus::Unhandled,
        };
        match written {
            Ok(()) => SetupStatus::Ok,
            Err(_) => SetupStatus::Fail,
        }
    }

    fn class_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut ControlResponse,
    ) -> SetupStatus {
        let result = match (setup.is_in(), setup.request) {
            (false, HID_SET_REPORT) => match ReportType::from_wire(setup.value_high()) {
                Some(ReportType::Output) => self.handler.set_output_report(data),
                Some(ReportType::Feature) => self.handler.set_feature_report(data),
                _ => Err(ReportError::Unsupported),
            },
            (false, HID_SET_IDLE) => {
                self.idle = setup.value_high();
                Ok(())
            }
            (false, HID_SET_PROTOCOL) => {
                self.protocol = setup.value_low();
                Ok(())
            }
            (true, HID_GET_IDLE) => response.write(&[self.idle]).map_err(|_| ReportError::Length),
            (true, HID_GET_PROTOCOL) => response
                .write(&[self.protocol])
                .map_err(|_| ReportError::Length),
            _ => return SetupStatus::Unhandled,
        };
        match result {
            Ok(()) => SetupStatus::Ok,
            Err(_) => SetupStatus::Fail,
        }
    }
}

impl<H: ReportHandler + Send> ClassDriver for HidFunction<H> {
    fn handle_setup(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut ControlResponse,
    ) -> SetupStatus {
        if setup.recipient() != Recipient::Interface || setup.index != u16::from(self.interface) {
            return SetupStatus::Unhandled;
        }
        match setup.kind() {
            RequestKind::Standard => self.standard_request(setup, response),
            RequestKind::Class => self.class_request(setup, data, response),
            _ => SetupStatus::Unhandled,
        }
    }
}

/// Gamepad interface: LED output reports and the bootloader feature byte.
pub struct GamepadHandler<'a, L, C> {
    flags: &'a ControlFlags,
    leds: &'a L,
    clock: &'a C,
}

impl<'a, L: LedOutputs, C: Clock> GamepadHandler<'a, L, C> {
    pub fn new(flags: &'a ControlFlags, leds: &'a L, clock: &'a C) -> Self {
        Self { flags, leds, clock }
    }
}

impl<L: LedOutputs, C: Clock> ReportHandler for GamepadHandler<'_, L, C> {
    /// Bit n of the little-endian bitmap drives LED n.
    fn set_output_report(&mut self, data: &[u8]) -> Result<(), ReportError> {
        let mask = match *data {
            [] => return Err(ReportError::Length),
            [lo] => lo as u16,
            [lo, hi, ..] => u16::from_le_bytes([lo, hi]),
        };
        self.flags.record_led_update(self.clock.now_ms());
        self.leds.set(mask & BUTTON_MASK);
        Ok(())
    }

    fn set_feature_report(&mut self, data: &[u8]) -> Result<(), ReportError> {
        let [command] = *data else {
            return Err(ReportError::Length);
        };
        match command {
            FEATURE_NOP => Ok(()),
            FEATURE_RESET_BOOTLOADER => {
                self.flags.request_reset();
                Ok(())
            }
            other => Err(ReportError::UnknownCommand(other)),
        }
    }
}

/// Keyboard interface: output reports (host keyboard LEDs) are accepted and
/// ignored; there is no feature channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardHandler;

impl ReportHandler for KeyboardHandler {
    fn set_output_report(&mut self, _data: &[u8]) -> Result<(), ReportError> {
        Ok(())
    }

    fn set_feature_report(&mut self, _data: &[u8]) -> Result<(), ReportError> {
        Err(ReportError::Unsupported)
    }
}

pub type GamepadFunction<'a, L, C> = HidFunction<GamepadHandler<'a, L, C>>;
pub type KeyboardFunction = HidFunction<KeyboardHandler>;

/// Gamepad function on interface 0, endpoint 0x81.
pub fn gamepad_function<'a, L: LedOutputs, C: Clock>(
    flags: &'a ControlFlags,
    leds: &'a L,
    clock: &'a C,
) -> GamepadFunction<'a, L, C> {
    HidFunction::new(
        GAMEPAD_INTERFACE,
        GAMEPAD_ENDPOINT,
        GAMEPAD_REPORT_DESCRIPTOR,
        GamepadHandler::new(flags, leds, clock),
    )
}

/// Keyboard function on interface 1, endpoint 0x82.
#[must_use]
pub fn keyboard_function() -> KeyboardFunction {
    HidFunction::new(
        KEYBOARD_INTERFACE,
        KEYBOARD_ENDPOINT,
        KEYBOARD_REPORT_DESCRIPTOR,
        KeyboardHandler,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlDispatcher;
    use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

    struct MockLeds(AtomicU16);

    impl LedOutputs for MockLeds {
        fn set(&self, mask: u16) {
            self.0.store(mask, Ordering::Relaxed);
        }
    }

    struct MockClock(AtomicU32);

    impl Clock for MockClock {
        fn now_ms(&self) -> u32 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn set_report(interface: u8, report_type: u8, length: u16) -> SetupPacket {
        SetupPacket {
            request_type: 0x21,
            request: HID_SET_REPORT,
            value: (report_type as u16) << 8,
            index: interface as u16,
            length,
        }
    }

    fn fixtures() -> (ControlFlags, MockLeds, MockClock) {
        (
            ControlFlags::new(),
            MockLeds(AtomicU16::new(0)),
            MockClock(AtomicU32::new(2500)),
        )
    }

    #[test]
    fn test_output_report_sets_leds_and_timestamp() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut response = ControlResponse::new(0);

        let status = gamepad.handle_setup(&set_report(0, 2, 2), &[0x05, 0xfc], &mut response);
        assert_eq!(status, SetupStatus::Ok);
        // Bits above LED 10 are dropped.
        assert_eq!(leds.0.load(Ordering::Relaxed), 0x0405);
        assert_eq!(flags.last_led_update(), 2500);
    }

    #[test]
    fn test_empty_output_report_rejected() {
        let (flags, leds, clock) = fixtures();
        let mut handler = GamepadHandler::new(&flags, &leds, &clock);
        assert_eq!(handler.set_output_report(&[]), Err(ReportError::Length));
        assert_eq!(flags.last_led_update(), 0);
    }

    #[test]
    fn test_feature_reset_sets_flag() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut response = ControlResponse::new(0);

        let status = gamepad.handle_setup(&set_report(0, 3, 1), &[0x10], &mut response);
        assert_eq!(status, SetupStatus::Ok);
        assert!(flags.reset_requested());
    }

    #[test]
    fn test_feature_nop_and_rejections() {
        let (flags, leds, clock) = fixtures();
        let mut handler = GamepadHandler::new(&flags, &leds, &clock);

        assert_eq!(handler.set_feature_report(&[0x00]), Ok(()));
        assert_eq!(handler.set_feature_report(&[0x11]), Err(ReportError::UnknownCommand(0x11)));
        assert_eq!(handler.set_feature_report(&[]), Err(ReportError::Length));
        assert_eq!(handler.set_feature_report(&[0x10, 0x00]), Err(ReportError::Length));
        assert!(!flags.reset_requested());
    }

    #[test]
    fn test_rejected_feature_stalls() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut response = ControlResponse::new(0);
        let status = gamepad.handle_setup(&set_report(0, 3, 1), &[0x42], &mut response);
        assert_eq!(status, SetupStatus::Fail);
    }

    #[test]
    fn test_keyboard_handler() {
        let mut keyboard = keyboard_function();
        let mut response = ControlResponse::new(0);
        assert_eq!(
            keyboard.handle_setup(&set_report(1, 2, 1), &[0x01], &mut response),
            SetupStatus::Ok
        );
        assert_eq!(
            keyboard.handle_setup(&set_report(1, 3, 1), &[0x10], &mut response),
            SetupStatus::Fail
        );
    }

    #[test]
    fn test_input_set_report_rejected() {
        let mut keyboard = keyboard_function();
        let mut response = ControlResponse::new(0);
        assert_eq!(
            keyboard.handle_setup(&set_report(1, 1, 1), &[0x00], &mut response),
            SetupStatus::Fail
        );
    }

    #[test]
    fn test_other_interface_unhandled() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut response = ControlResponse::new(0);
        assert_eq!(
            gamepad.handle_setup(&set_report(1, 3, 1), &[0x10], &mut response),
            SetupStatus::Unhandled
        );
        assert!(!flags.reset_requested());
    }

    #[test]
    fn test_reserved_index_byte_not_ignored() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut response = ControlResponse::new(0);
        let request = SetupPacket {
            index: 0x0100,
            ..set_report(0, 3, 1)
        };
        assert_eq!(
            gamepad.handle_setup(&request, &[0x10], &mut response),
            SetupStatus::Unhandled
        );
        assert!(!flags.reset_requested());
    }

    #[test]
    fn test_report_and_hid_descriptors() {
        let mut keyboard = keyboard_function();

        let mut response = ControlResponse::new(0xff);
        let request = SetupPacket {
            request_type: 0x81,
            request: REQUEST_GET_DESCRIPTOR,
            value: (DESCRIPTOR_REPORT as u16) << 8,
            index: 1,
            length: 0xff,
        };
        assert_eq!(keyboard.handle_setup(&request, &[], &mut response), SetupStatus::Ok);
        assert_eq!(response.as_bytes(), KEYBOARD_REPORT_DESCRIPTOR);

        let mut response = ControlResponse::new(9);
        let request = SetupPacket {
            value: (DESCRIPTOR_HID as u16) << 8,
            length: 9,
            ..request
        };
        assert_eq!(keyboard.handle_setup(&request, &[], &mut response), SetupStatus::Ok);
        let bytes = response.as_bytes();
        assert_eq!(bytes, keyboard.hid_descriptor());
        assert_eq!(bytes[1], DESCRIPTOR_HID);
        assert_eq!(
            u16::from_le_bytes([bytes[7], bytes[8]]) as usize,
            KEYBOARD_REPORT_DESCRIPTOR.len()
        );
    }

    #[test]
    fn test_report_descriptor_longer_than_packet() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let request = SetupPacket {
            request_type: 0x81,
            request: REQUEST_GET_DESCRIPTOR,
            value: (DESCRIPTOR_REPORT as u16) << 8,
            index: 0,
            length: 0x200,
        };
        let mut response = ControlResponse::new(request.length);
        assert_eq!(gamepad.handle_setup(&request, &[], &mut response), SetupStatus::Ok);
        assert_eq!(response.as_bytes(), GAMEPAD_REPORT_DESCRIPTOR);
        assert!(response.len() > 64);
    }

    #[test]
    fn test_idle_and_protocol() {
        let mut keyboard = keyboard_function();
        let mut response = ControlResponse::new(1);

        let set_idle = SetupPacket {
            request_type: 0x21,
            request: HID_SET_IDLE,
            value: 0x7d00,
            index: 1,
            length: 0,
        };
        assert_eq!(keyboard.handle_setup(&set_idle, &[], &mut response), SetupStatus::Ok);
        assert_eq!(keyboard.idle(), 0x7d);

        let get_idle = SetupPacket {
            request_type: 0xA1,
            request: HID_GET_IDLE,
            value: 0,
            index: 1,
            length: 1,
        };
        assert_eq!(keyboard.handle_setup(&get_idle, &[], &mut response), SetupStatus::Ok);
        assert_eq!(response.as_bytes(), &[0x7du8]);

        let set_protocol = SetupPacket {
            request_type: 0x21,
            request: HID_SET_PROTOCOL,
            value: 0,
            index: 1,
            length: 0,
        };
        assert_eq!(keyboard.handle_setup(&set_protocol, &[], &mut response), SetupStatus::Ok);
        assert_eq!(keyboard.protocol(), 0);
    }

    #[test]
    fn test_get_report_unhandled() {
        let mut keyboard = keyboard_function();
        let mut response = ControlResponse::new(13);
        let request = SetupPacket {
            request_type: 0xA1,
            request: HID_GET_REPORT,
            value: 0x0100,
            index: 1,
            length: 13,
        };
        assert_eq!(keyboard.handle_setup(&request, &[], &mut response), SetupStatus::Unhandled);
    }

    #[test]
    fn test_dispatcher_routes_feature_to_gamepad() {
        let (flags, leds, clock) = fixtures();
        let mut gamepad = gamepad_function(&flags, &leds, &clock);
        let mut keyboard = keyboard_function();

        let mut dispatcher = ControlDispatcher::new(0);
        dispatcher.register(&mut gamepad).unwrap();
        dispatcher.register(&mut keyboard).unwrap();

        let mut response = ControlResponse::new(1);
        let raw = [0x21, HID_SET_REPORT, 0x00, 0x03, 0x00, 0x00, 0x01, 0x00];
        let status = dispatcher.handle_setup(&SetupPacket::parse(&raw), &[0x10], &mut response);
        assert_eq!(status, SetupStatus::Ok);
        assert!(flags.reset_requested());
    }
}
