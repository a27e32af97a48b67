//! Control-transfer dispatch for the composite device.
//!
//! The transport hands every SETUP packet (plus any OUT data stage) to
//! [`ControlDispatcher::handle_setup`]. Device, configuration and string
//! descriptors are served directly; everything else is offered to the
//! registered [`ClassDriver`]s in registration order until one claims it.

use crate::config::{
    CONTROL_BUFFER_SIZE, MAX_CLASS_DRIVERS, STRING_INDEX_MANUFACTURER, STRING_INDEX_PRODUCT,
    STRING_INDEX_SERIAL, USB_LANGID, USB_MANUFACTURER, USB_PRODUCT,
};
use crate::descriptor::{
    encode_langids, encode_string, hex_str, serial_hex, CONFIGURATION_DESCRIPTOR,
    DESCRIPTOR_CONFIGURATION, DESCRIPTOR_DEVICE, DESCRIPTOR_STRING, DEVICE_DESCRIPTOR_BYTES,
};
use heapless::Vec;

/// Standard GET_DESCRIPTOR request code (USB 2.0 table 9-4).
pub const REQUEST_GET_DESCRIPTOR: u8 = 0x06;

/// Request type bits 5..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Request type bits 0..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

/// The 8-byte SETUP stage of a control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Parse the little-endian wire form.
    #[must_use]
    pub const fn parse(raw: &[u8; 8]) -> Self {
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    /// Device-to-host data stage.
    #[inline]
    #[must_use]
    pub const fn is_in(&self) -> bool {
        self.request_type & 0x80 != 0
    }

    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match (self.request_type >> 5) & 0x03 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    #[must_use]
    pub const fn recipient(&self) -> Recipient {
        match self.request_type & 0x1f {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            _ => Recipient::Other,
        }
    }

    /// High byte of `wValue` (descriptor type, report type, idle rate).
    #[inline]
    #[must_use]
    pub const fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Low byte of `wValue` (descriptor index, report ID).
    #[inline]
    #[must_use]
    pub const fn value_low(&self) -> u8 {
        self.value as u8
    }
}

/// Outcome of offering a request to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupStatus {
    /// Request handled; any IN data is in the response.
    Ok,
    /// Request was addressed to this handler but rejected; stall.
    Fail,
    /// Not for this handler.
    Unhandled,
}

/// Error type for control handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Response data exceeds the control buffer.
    BufferOverflow,
    /// No room left in the driver registry.
    RegistryFull,
}

impl core::fmt::Display for ControlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ControlError::BufferOverflow => f.write_str("control response exceeds buffer"),
            ControlError::RegistryFull => f.write_str("class driver registry is full"),
        }
    }
}

/// IN data-stage buffer, truncated to the host's `wLength`.
#[derive(Debug, Clone)]
pub struct ControlResponse {
    data: Vec<u8, CONTROL_BUFFER_SIZE>,
    limit: usize,
}

impl ControlResponse {
    /// Empty response accepting at most `limit` bytes.
    #[must_use]
    pub fn new(limit: u16) -> Self {
        Self {
            data: Vec::new(),
            limit: limit as usize,
        }
    }

    /// Append `bytes`; anything past the host's limit is dropped silently.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ControlError> {
        let room = self.limit.saturating_sub(self.data.len());
        let take = bytes.len().min(room);
        self.data
            .extend_from_slice(&bytes[..take])
            .map_err(|_| ControlError::BufferOverflow)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A per-interface class driver.
///
/// Drivers run in the transport's control context, which may preempt the
/// main loop, hence `Send`. A driver must only claim requests addressed to
/// its own interface.
pub trait ClassDriver: Send {
    /// Handle one control request. `data` holds the OUT data stage, if any.
    fn handle_setup(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut ControlResponse,
    ) -> SetupStatus;
}

/// Chain-of-responsibility dispatcher over the registered class drivers.
pub struct ControlDispatcher<'a> {
    drivers: Vec<&'a mut dyn ClassDriver, MAX_CLASS_DRIVERS>,
    serial: [u8; 8],
}

impl<'a> ControlDispatcher<'a> {
    /// Create a dispatcher serving `serial` as string descriptor 3.
    #[must_use]
    pub fn new(serial: u32) -> Self {
        Self {
            drivers: Vec::new(),
            serial: serial_hex(serial),
        }
    }

    /// Append a driver; earlier registrations are asked first.
    pub fn register(&mut self, driver: &'a mut dyn ClassDriver) -> Result<(), ControlError> {
        self.drivers
            .push(driver)
            .map_err(|_| ControlError::RegistryFull)
    }

    /// Number of registered drivers.
    #[must_use]
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Serial number string as served in string descriptor 3.
    #[must_use]
    pub fn serial(&self) -> &str {
        hex_str(&self.serial)
    }

    /// Text of string descriptor `index`, if the device has one.
    #[must_use]
    pub fn string(&self, index: u8) -> Option<&str> {
        match index {
            STRING_INDEX_MANUFACTURER => Some(USB_MANUFACTURER),
            STRING_INDEX_PRODUCT => Some(USB_PRODUCT),
            STRING_INDEX_SERIAL => Some(self.serial()),
            _ => None,
        }
    }

    /// Route one control request.
    pub fn handle_setup(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut ControlResponse,
    ) -> SetupStatus {
        if setup.request_type == 0x80 && setup.request == REQUEST_GET_DESCRIPTOR {
            let status = self.get_descriptor(setup, response);
            if status != SetupStatus::Unhandled {
                return status;
            }
        }

        for driver in self.drivers.iter_mut() {
            response.clear();
            match driver.handle_setup(setup, data, response) {
                SetupStatus::Unhandled => {}
                status => return status,
            }
        }
        response.clear();
        SetupStatus::Unhandled
    }

    fn get_descriptor(&self, setup: &SetupPacket, response: &mut ControlResponse) -> SetupStatus {
        let written = match setup.value_high() {
            DESCRIPTOR_DEVICE => response.write(DEVICE_DESCRIPTOR_BYTES),
            DESCRIPTOR_CONFIGURATION => response.write(CONFIGURATION_DESCRIPTOR),
            DESCRIPTOR_STRING => {
                let mut buf = [0u8; 64];
                let len = match setup.value_low() {
                    0 => encode_langids(&[USB_LANGID], &mut buf),
                    index => self
                        .string(index)
                        .and_then(|text| encode_string(text, &mut buf)),
                };
                match len {
                    Some(len) => response.write(&buf[..len]),
                    None => return SetupStatus::Unhandled,
                }
            }
            _ => return SetupStatus::Unhandled,
        };
        match written {
            Ok(()) => SetupStatus::Ok,
            Err(_) => SetupStatus::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec as StdVec;

    fn get_descriptor(kind: u8, index: u8, length: u16) -> SetupPacket {
        SetupPacket {
            request_type: 0x80,
            request: REQUEST_GET_DESCRIPTOR,
            value: (kind as u16) << 8 | index as u16,
            index: 0,
            length,
        }
    }

    /// Claims requests whose wIndex matches, recording the order it was asked in.
    struct Recorder {
        interface: u16,
        status: SetupStatus,
        calls: usize,
    }

    impl Recorder {
        fn new(interface: u16, status: SetupStatus) -> Self {
            Self {
                interface,
                status,
                calls: 0,
            }
        }
    }

    impl ClassDriver for Recorder {
        fn handle_setup(
            &mut self,
            setup: &SetupPacket,
            data: &[u8],
            response: &mut ControlResponse,
        ) -> SetupStatus {
            self.calls += 1;
            if setup.index != self.interface {
                return SetupStatus::Unhandled;
            }
            let _ = response.write(data);
            self.status
        }
    }

    #[test]
    fn test_setup_packet_parse() {
        let setup = SetupPacket::parse(&[0x21, 0x09, 0x00, 0x03, 0x01, 0x00, 0x01, 0x00]);
        assert_eq!(setup.request_type, 0x21);
        assert_eq!(setup.request, 0x09);
        assert_eq!(setup.value_high(), 0x03);
        assert_eq!(setup.value_low(), 0x00);
        assert_eq!(setup.index, 1);
        assert_eq!(setup.length, 1);
        assert!(!setup.is_in());
        assert_eq!(setup.kind(), RequestKind::Class);
        assert_eq!(setup.recipient(), Recipient::Interface);
    }

    #[test]
    fn test_response_truncates_to_limit() {
        let mut response = ControlResponse::new(4);
        response.write(&[1, 2, 3]).unwrap();
        response.write(&[4, 5, 6]).unwrap();
        assert_eq!(response.as_bytes(), &[1u8, 2, 3, 4]);
    }

    #[test]
    fn test_response_overflow() {
        let mut response = ControlResponse::new(u16::MAX);
        let big = [0u8; CONTROL_BUFFER_SIZE + 1];
        assert_eq!(response.write(&big), Err(ControlError::BufferOverflow));
    }

    #[test]
    fn test_device_descriptor_truncated() {
        let mut dispatcher = ControlDispatcher::new(0);
        let mut response = ControlResponse::new(8);
        let status = dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_DEVICE, 0, 8), &[], &mut response);
        assert_eq!(status, SetupStatus::Ok);
        assert_eq!(response.as_bytes(), &DEVICE_DESCRIPTOR_BYTES[..8]);
    }

    #[test]
    fn test_configuration_descriptor() {
        let mut dispatcher = ControlDispatcher::new(0);

        let mut response = ControlResponse::new(9);
        dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_CONFIGURATION, 0, 9), &[], &mut response);
        assert_eq!(response.len(), 9);

        let mut response = ControlResponse::new(0xff);
        dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_CONFIGURATION, 0, 0xff), &[], &mut response);
        assert_eq!(response.as_bytes(), CONFIGURATION_DESCRIPTOR);
    }

    #[test]
    fn test_string_descriptors() {
        let mut dispatcher = ControlDispatcher::new(0xdead_beef);

        let mut response = ControlResponse::new(0xff);
        dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_STRING, 0, 0xff), &[], &mut response);
        assert_eq!(response.as_bytes(), &[4u8, 3, 0x09, 0x04]);

        let mut response = ControlResponse::new(0xff);
        dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_STRING, 1, 0xff), &[], &mut response);
        assert_eq!(response.as_bytes(), &[8u8, 3, b'z', 0, b'y', 0, b'p', 0]);

        let mut response = ControlResponse::new(0xff);
        dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_STRING, 3, 0xff), &[], &mut response);
        let bytes = response.as_bytes();
        assert_eq!(bytes[0], 18);
        assert_eq!(bytes[1], DESCRIPTOR_STRING);
        let text: StdVec<u8> = bytes[2..].chunks(2).map(|c| c[0]).collect();
        assert_eq!(&text, b"DEADBEEF");
    }

    #[test]
    fn test_string_lookup() {
        let dispatcher = ControlDispatcher::new(0x0000_00a5);
        assert_eq!(dispatcher.string(1), Some("zyp"));
        assert_eq!(dispatcher.string(2), Some("arcin"));
        assert_eq!(dispatcher.string(3), Some("000000A5"));
        assert_eq!(dispatcher.string(0), None);
        assert_eq!(dispatcher.string(4), None);
    }

    #[test]
    fn test_string_truncated_to_length() {
        let mut dispatcher = ControlDispatcher::new(0x1234_5678);
        let mut response = ControlResponse::new(2);
        let status = dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_STRING, 3, 2), &[], &mut response);
        assert_eq!(status, SetupStatus::Ok);
        assert_eq!(response.as_bytes(), &[18u8, DESCRIPTOR_STRING]);
    }

    #[test]
    fn test_unknown_string_is_unhandled() {
        let mut dispatcher = ControlDispatcher::new(0);
        let mut response = ControlResponse::new(0xff);
        let status = dispatcher.handle_setup(&get_descriptor(DESCRIPTOR_STRING, 4, 0xff), &[], &mut response);
        assert_eq!(status, SetupStatus::Unhandled);
        assert!(response.is_empty());
    }

    #[test]
    fn test_drivers_asked_in_order_until_claimed() {
        let mut first = Recorder::new(0, SetupStatus::Ok);
        let mut second = Recorder::new(1, SetupStatus::Fail);
        let mut third = Recorder::new(1, SetupStatus::Ok);

        let request = SetupPacket {
            request_type: 0x21,
            request: 0x09,
            value: 0,
            index: 1,
            length: 1,
        };

        {
            let mut dispatcher = ControlDispatcher::new(0);
            dispatcher.register(&mut first).unwrap();
            dispatcher.register(&mut second).unwrap();
            dispatcher.register(&mut third).unwrap();

            let mut response = ControlResponse::new(1);
            assert_eq!(dispatcher.handle_setup(&request, &[0x10], &mut response), SetupStatus::Fail);
        }

        assert_eq!(first.calls, 1);
        assert_eq!(second.calls, 1);
        assert_eq!(third.calls, 0);
    }

    #[test]
    fn test_all_unhandled() {
        let mut only = Recorder::new(0, SetupStatus::Ok);
        let mut dispatcher = ControlDispatcher::new(0);
        dispatcher.register(&mut only).unwrap();

        let request = SetupPacket {
            request_type: 0x21,
            request: 0x0A,
            value: 0,
            index: 5,
            length: 0,
        };
        let mut response = ControlResponse::new(0);
        assert_eq!(dispatcher.handle_setup(&request, &[], &mut response), SetupStatus::Unhandled);
    }

    #[test]
    fn test_registry_full() {
        let mut drivers: [Recorder; MAX_CLASS_DRIVERS + 1] =
            core::array::from_fn(|i| Recorder::new(i as u16, SetupStatus::Ok));
        let mut dispatcher = ControlDispatcher::new(0);
        let (last, rest) = drivers.split_last_mut().unwrap();
        for driver in rest.iter_mut() {
            dispatcher.register(driver).unwrap();
        }
        assert_eq!(dispatcher.register(last), Err(ControlError::RegistryFull));
        assert_eq!(dispatcher.driver_count(), MAX_CLASS_DRIVERS);
    }
}
