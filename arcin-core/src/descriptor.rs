//! USB and HID descriptors.
//!
//! Everything here is built at compile time. Length fields are derived from
//! the serialised size of what they describe, never written by hand, so the
//! tables stay consistent when fields are added or reordered.
//!
//! Layout of the configuration:
//!
//! ```text
//! Configuration 1
//! ├── Interface 0 (HID): gamepad, EP 0x81 interrupt IN, 16 B, 1 ms
//! └── Interface 1 (HID): keyboard, EP 0x82 interrupt IN, 16 B, 1 ms
//! ```

use crate::config::{
    BUTTON_COUNT, CONTROL_MAX_PACKET, GAMEPAD_ENDPOINT, GAMEPAD_INTERFACE, HID_SPEC_RELEASE,
    KEYBOARD_ENDPOINT, KEYBOARD_INTERFACE, REPORT_MAX_PACKET, REPORT_POLL_MS,
    STRING_INDEX_MANUFACTURER, STRING_INDEX_PRODUCT, STRING_INDEX_SERIAL, USB_DEVICE_RELEASE,
    USB_PID, USB_SPEC_RELEASE, USB_VID,
};

// Descriptor types
pub const DESCRIPTOR_DEVICE: u8 = 0x01;
pub const DESCRIPTOR_CONFIGURATION: u8 = 0x02;
pub const DESCRIPTOR_STRING: u8 = 0x03;
pub const DESCRIPTOR_INTERFACE: u8 = 0x04;
pub const DESCRIPTOR_ENDPOINT: u8 = 0x05;
pub const DESCRIPTOR_HID: u8 = 0x21;
pub const DESCRIPTOR_REPORT: u8 = 0x22;

/// Interface class code for HID.
pub const CLASS_HID: u8 = 0x03;
const ENDPOINT_INTERRUPT: u8 = 0x03;

/// Copy `src` into `out` at `pos`.
const fn splice<const N: usize>(mut out: [u8; N], pos: usize, src: &[u8]) -> [u8; N] {
    let mut i = 0;
    while i < src.len() {
        out[pos + i] = src[i];
        i += 1;
    }
    out
}

const fn lo(value: u16) -> u8 {
    value as u8
}

const fn hi(value: u16) -> u8 {
    (value >> 8) as u8
}

/// Standard device descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub usb_release: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub manufacturer_string: u8,
    pub product_string: u8,
    pub serial_string: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub const LEN: usize = 18;

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESCRIPTOR_DEVICE,
            lo(self.usb_release),
            hi(self.usb_release),
            self.class,
            self.subclass,
            self.protocol,
            self.max_packet_size_0,
            lo(self.vendor_id),
            hi(self.vendor_id),
            lo(self.product_id),
            hi(self.product_id),
            lo(self.device_release),
            hi(self.device_release),
            self.manufacturer_string,
            self.product_string,
            self.serial_string,
            self.num_configurations,
        ]
    }
}

/// Configuration descriptor header (without the interfaces that follow it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationHeader {
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_string: u8,
    pub attributes: u8,
    pub max_power: u8,
}

impl ConfigurationHeader {
    pub const LEN: usize = 9;

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESCRIPTOR_CONFIGURATION,
            lo(self.total_length),
            hi(self.total_length),
            self.num_interfaces,
            self.configuration_value,
            self.configuration_string,
            self.attributes,
            self.max_power,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub string: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESCRIPTOR_INTERFACE,
            self.number,
            self.alternate_setting,
            self.num_endpoints,
            self.class,
            self.subclass,
            self.protocol,
            self.string,
        ]
    }
}

/// HID class descriptor with a single report descriptor reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDescriptor {
    pub hid_release: u16,
    pub country_code: u8,
    pub report_length: u16,
}

impl HidDescriptor {
    pub const LEN: usize = 9;

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESCRIPTOR_HID,
            lo(self.hid_release),
            hi(self.hid_release),
            self.country_code,
            1, // bNumDescriptors
            DESCRIPTOR_REPORT,
            lo(self.report_length),
            hi(self.report_length),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESCRIPTOR_ENDPOINT,
            self.address,
            self.attributes,
            lo(self.max_packet_size),
            hi(self.max_packet_size),
            self.interval,
        ]
    }
}

/// One HID interface: interface, HID and endpoint descriptors in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidInterface {
    pub interface: InterfaceDescriptor,
    pub hid: HidDescriptor,
    pub endpoint: EndpointDescriptor,
}

impl HidInterface {
    pub const LEN: usize = InterfaceDescriptor::LEN + HidDescriptor::LEN + EndpointDescriptor::LEN;

    /// Interrupt-IN-only HID interface with no boot subclass.
    #[must_use]
    pub const fn new(number: u8, endpoint: u8, report_length: usize) -> Self {
        Self {
            interface: InterfaceDescriptor {
                number,
                alternate_setting: 0,
                num_endpoints: 1,
                class: CLASS_HID,
                subclass: 0,
                protocol: 0,
                string: 0,
            },
            hid: HidDescriptor {
                hid_release: HID_SPEC_RELEASE,
                country_code: 0,
                report_length: report_length as u16,
            },
            endpoint: EndpointDescriptor {
                address: endpoint,
                attributes: ENDPOINT_INTERRUPT,
                max_packet_size: REPORT_MAX_PACKET,
                interval: REPORT_POLL_MS,
            },
        }
    }

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::LEN] {
        let out = splice([0; Self::LEN], 0, &self.interface.to_bytes());
        let out = splice(out, InterfaceDescriptor::LEN, &self.hid.to_bytes());
        splice(
            out,
            InterfaceDescriptor::LEN + HidDescriptor::LEN,
            &self.endpoint.to_bytes(),
        )
    }
}

// Report descriptors

/// Gamepad inputs: 11 buttons, 5 padding bits, X and Y axes.
const GAMEPAD_INPUTS: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Buttons ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, BUTTON_COUNT as u8, //   Usage Maximum (Button 11)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, BUTTON_COUNT as u8, //   Report Count (11)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x05, //   Report Count (5)
    0x81, 0x01, //   Input (Constant)
    //
    // --- X axis (encoder 1) ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Y axis (encoder 2) ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- LEDs ---
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
];

/// One LED output bit in its own logical collection; the usage byte is patched per LED.
const LED_COLLECTION: [u8; 17] = [
    0x05, 0x0A, //   Usage Page (Ordinal)
    0x09, 0x00, //   Usage (Instance n)
    0xA1, 0x02, //   Collection (Logical)
    0x05, 0x08, //     Usage Page (LEDs)
    0x09, 0x4B, //     Usage (Generic Indicator)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x01, //     Report Count (1)
    0x91, 0x02, //     Output (Data, Variable, Absolute)
    0xC0, //   End Collection
];

/// Offset of the ordinal usage byte in [`LED_COLLECTION`].
const LED_ORDINAL_OFFSET: usize = 3;

/// Output padding and the vendor bootloader feature byte.
const GAMEPAD_TAIL: &[u8] = &[
    0x75, 0x01, //   Report Size (1)
    0x95, 0x05, //   Report Count (5)
    0x91, 0x01, //   Output (Constant)
    //
    // --- Bootloader trigger ---
    0x06, 0x55, 0xFF, //   Usage Page (Vendor 0xFF55)
    0x0A, 0x07, 0xB0, //   Usage (0xB007)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

const GAMEPAD_REPORT_LEN: usize =
    GAMEPAD_INPUTS.len() + BUTTON_COUNT * LED_COLLECTION.len() + GAMEPAD_TAIL.len();

const fn gamepad_report_descriptor() -> [u8; GAMEPAD_REPORT_LEN] {
    let mut out = splice([0; GAMEPAD_REPORT_LEN], 0, GAMEPAD_INPUTS);
    let mut pos = GAMEPAD_INPUTS.len();
    let mut led = 0;
    while led < BUTTON_COUNT {
        let mut collection = LED_COLLECTION;
        collection[LED_ORDINAL_OFFSET] = led as u8 + 1;
        out = splice(out, pos, &collection);
        pos += LED_COLLECTION.len();
        led += 1;
    }
    splice(out, pos, GAMEPAD_TAIL)
}

/// Gamepad report descriptor.
///
/// - Input: 16-bit button mask (11 used), X, Y
/// - Output: 11 LEDs, each addressable as its own collection, 5 padding bits
/// - Feature: vendor byte used as the bootloader trigger
pub const GAMEPAD_REPORT_DESCRIPTOR: &[u8] = &gamepad_report_descriptor();

/// Keyboard report descriptor: 13 scan-code slots.
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x95, 0x0D, //   Report Count (13)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];

// Device and configuration

pub const DEVICE_DESCRIPTOR: DeviceDescriptor = DeviceDescriptor {
    usb_release: USB_SPEC_RELEASE,
    class: 0,
    subclass: 0,
    protocol: 0,
    max_packet_size_0: CONTROL_MAX_PACKET,
    vendor_id: USB_VID,
    product_id: USB_PID,
    device_release: USB_DEVICE_RELEASE,
    manufacturer_string: STRING_INDEX_MANUFACTURER,
    product_string: STRING_INDEX_PRODUCT,
    serial_string: STRING_INDEX_SERIAL,
    num_configurations: 1,
};

pub const DEVICE_DESCRIPTOR_BYTES: &[u8] = &DEVICE_DESCRIPTOR.to_bytes();

/// Both HID interfaces in interface-number order.
pub const INTERFACES: [HidInterface; 2] = [
    HidInterface::new(
        GAMEPAD_INTERFACE,
        GAMEPAD_ENDPOINT,
        GAMEPAD_REPORT_DESCRIPTOR.len(),
    ),
    HidInterface::new(
        KEYBOARD_INTERFACE,
        KEYBOARD_ENDPOINT,
        KEYBOARD_REPORT_DESCRIPTOR.len(),
    ),
];

/// Value reported in SET_CONFIGURATION / GET_CONFIGURATION.
pub const CONFIGURATION_VALUE: u8 = 1;

const CONFIGURATION_LEN: usize = ConfigurationHeader::LEN + INTERFACES.len() * HidInterface::LEN;

const fn configuration_descriptor() -> [u8; CONFIGURATION_LEN] {
    let header = ConfigurationHeader {
        total_length: CONFIGURATION_LEN as u16,
        num_interfaces: INTERFACES.len() as u8,
        configuration_value: CONFIGURATION_VALUE,
        configuration_string: 0,
        attributes: 0xC0, // self-powered
        max_power: 0,
    };
    let mut out = splice([0; CONFIGURATION_LEN], 0, &header.to_bytes());
    let mut i = 0;
    while i < INTERFACES.len() {
        out = splice(
            out,
            ConfigurationHeader::LEN + i * HidInterface::LEN,
            &INTERFACES[i].to_bytes(),
        );
        i += 1;
    }
    out
}

/// Full configuration descriptor, interfaces included.
pub const CONFIGURATION_DESCRIPTOR: &[u8] = &configuration_descriptor();

// Strings

/// Factory serial: wrapping product of the three unique-ID words.
#[inline]
#[must_use]
pub const fn serial_number(unique_id: [u32; 3]) -> u32 {
    unique_id[0]
        .wrapping_mul(unique_id[1])
        .wrapping_mul(unique_id[2])
}

/// Render `serial` as 8 uppercase hex digits, most significant first.
#[must_use]
pub const fn serial_hex(serial: u32) -> [u8; 8] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = [0u8; 8];
    let mut i = 0;
    while i < 8 {
        out[i] = HEX[((serial >> (28 - 4 * i)) & 0xf) as usize];
        i += 1;
    }
    out
}

/// [`serial_hex`] output as text.
#[must_use]
pub fn hex_str(hex: &[u8; 8]) -> &str {
    // Only ever filled from the ASCII hex table.
    core::str::from_utf8(hex).unwrap_or("")
}

/// Serialise a string descriptor for `text` into `out`.
///
/// Returns the descriptor length, or `None` if `out` is too small or the
/// text does not fit in a one-byte length.
pub fn encode_string(text: &str, out: &mut [u8]) -> Option<usize> {
    let len = 2 + 2 * text.encode_utf16().count();
    if len > u8::MAX as usize || len > out.len() {
        return None;
    }
    out[0] = len as u8;
    out[1] = DESCRIPTOR_STRING;
    for (unit, slot) in text.encode_utf16().zip(out[2..len].chunks_exact_mut(2)) {
        slot.copy_from_slice(&unit.to_le_bytes());
    }
    Some(len)
}

/// Serialise string descriptor 0 (supported language IDs).
pub fn encode_langids(langids: &[u16], out: &mut [u8]) -> Option<usize> {
    let len = 2 + 2 * langids.len();
    if len > u8::MAX as usize || len > out.len() {
        return None;
    }
    out[0] = len as u8;
    out[1] = DESCRIPTOR_STRING;
    for (id, slot) in langids.iter().zip(out[2..len].chunks_exact_mut(2)) {
        slot.copy_from_slice(&id.to_le_bytes());
    }
    Some(len)
}

// Report descriptor inspection

/// Error from [`report_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// An item runs past the end of the descriptor.
    Truncated,
    /// End Collection without a matching Collection, or a collection left open.
    UnbalancedCollection,
    /// Long items are not used by this device.
    LongItem,
}

/// Bit totals of the main items in a report descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportLayout {
    pub input_bits: u32,
    pub output_bits: u32,
    pub feature_bits: u32,
    pub collections: u32,
}

impl ReportLayout {
    /// Input report size in bytes, rounded up.
    #[must_use]
    pub const fn input_bytes(&self) -> usize {
        self.input_bits.div_ceil(8) as usize
    }

    #[must_use]
    pub const fn output_bytes(&self) -> usize {
        self.output_bits.div_ceil(8) as usize
    }

    #[must_use]
    pub const fn feature_bytes(&self) -> usize {
        self.feature_bits.div_ceil(8) as usize
    }
}

/// Walk the short items of a report descriptor (no report IDs) and total the
/// bits of each main item kind.
pub fn report_layout(descriptor: &[u8]) -> Result<ReportLayout, DescriptorError> {
    let mut layout = ReportLayout::default();
    let mut report_size = 0u32;
    let mut report_count = 0u32;
    let mut depth = 0u32;
    let mut pos = 0;

    while pos < descriptor.len() {
        let prefix = descriptor[pos];
        if prefix == 0xFE {
            return Err(DescriptorError::LongItem);
        }
        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let data = descriptor
            .get(pos + 1..pos + 1 + size)
            .ok_or(DescriptorError::Truncated)?;
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);

        match prefix & 0xFC {
            0x74 => report_size = value,
            0x94 => report_count = value,
            0x80 => layout.input_bits += report_size * report_count,
            0x90 => layout.output_bits += report_size * report_count,
            0xB0 => layout.feature_bits += report_size * report_count,
            0xA0 => {
                depth += 1;
                layout.collections += 1;
            }
            0xC0 => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(DescriptorError::UnbalancedCollection)?;
            }
            _ => {}
        }
        pos += 1 + size;
    }

    if depth != 0 {
        return Err(DescriptorError::UnbalancedCollection);
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::CONTROL_BUFFER_SIZE;
    use crate::types::{GamepadReport, KeyboardReport};
    use std::vec::Vec;

    /// Split a configuration descriptor into its sub-descriptors by bLength.
    fn split_descriptors(bytes: &[u8]) -> Vec<&[u8]> {
        let mut parts = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let len = bytes[pos] as usize;
            assert!(len >= 2, "zero-length descriptor at {pos}");
            assert!(pos + len <= bytes.len(), "descriptor at {pos} overruns");
            parts.push(&bytes[pos..pos + len]);
            pos += len;
        }
        parts
    }

    #[test]
    fn test_device_descriptor() {
        let bytes = DEVICE_DESCRIPTOR_BYTES;
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0] as usize, bytes.len());
        assert_eq!(bytes[1], DESCRIPTOR_DEVICE);
        assert_eq!(bytes[7], 64);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 0x1d50);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 0x6080);
        assert_eq!(&bytes[14..18], &[1u8, 2, 3, 1]);
    }

    #[test]
    fn test_configuration_lengths_match_serialised_sizes() {
        let config = CONFIGURATION_DESCRIPTOR;
        assert_eq!(
            u16::from_le_bytes([config[2], config[3]]) as usize,
            config.len()
        );

        let parts = split_descriptors(config);
        let types: Vec<u8> = parts.iter().map(|d| d[1]).collect();
        assert_eq!(
            types,
            [
                DESCRIPTOR_CONFIGURATION,
                DESCRIPTOR_INTERFACE,
                DESCRIPTOR_HID,
                DESCRIPTOR_ENDPOINT,
                DESCRIPTOR_INTERFACE,
                DESCRIPTOR_HID,
                DESCRIPTOR_ENDPOINT,
            ]
        );
        assert_eq!(parts[0][4], 2, "bNumInterfaces");
    }

    #[test]
    fn test_hid_descriptors_reference_report_lengths() {
        let parts = split_descriptors(CONFIGURATION_DESCRIPTOR);
        let hids: Vec<&[u8]> = parts
            .iter()
            .copied()
            .filter(|d| d[1] == DESCRIPTOR_HID)
            .collect();
        assert_eq!(hids.len(), 2);

        for (hid, report) in hids
            .iter()
            .zip([GAMEPAD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_DESCRIPTOR])
        {
            assert_eq!(hid[6], DESCRIPTOR_REPORT);
            assert_eq!(u16::from_le_bytes([hid[7], hid[8]]) as usize, report.len());
        }
    }

    #[test]
    fn test_endpoints() {
        let parts = split_descriptors(CONFIGURATION_DESCRIPTOR);
        let endpoints: Vec<&[u8]> = parts
            .iter()
            .copied()
            .filter(|d| d[1] == DESCRIPTOR_ENDPOINT)
            .collect();
        assert_eq!(endpoints[0], &[7u8, 5, 0x81, 0x03, 16, 0, 1]);
        assert_eq!(endpoints[1], &[7u8, 5, 0x82, 0x03, 16, 0, 1]);
    }

    #[test]
    fn test_gamepad_report_layout() {
        let layout = report_layout(GAMEPAD_REPORT_DESCRIPTOR).unwrap();
        assert_eq!(layout.input_bytes(), GamepadReport::SIZE);
        assert_eq!(layout.input_bits, 32);
        assert_eq!(layout.output_bits, 16);
        assert_eq!(layout.feature_bits, 8);
        // Application collection plus one per LED.
        assert_eq!(layout.collections, 1 + BUTTON_COUNT as u32);
    }

    #[test]
    fn test_led_collections_are_numbered() {
        let descriptor = GAMEPAD_REPORT_DESCRIPTOR;
        let start = GAMEPAD_INPUTS.len();
        for led in 0..BUTTON_COUNT {
            let collection = &descriptor[start + led * LED_COLLECTION.len()..][..LED_COLLECTION.len()];
            assert_eq!(&collection[..2], &[0x05u8, 0x0A]);
            assert_eq!(collection[LED_ORDINAL_OFFSET], led as u8 + 1);
        }
    }

    #[test]
    fn test_keyboard_report_layout() {
        let layout = report_layout(KEYBOARD_REPORT_DESCRIPTOR).unwrap();
        assert_eq!(layout.input_bytes(), KeyboardReport::SIZE);
        assert_eq!(layout.output_bits, 0);
        assert_eq!(layout.feature_bits, 0);
    }

    #[test]
    fn test_descriptors_fit_control_buffer() {
        assert!(GAMEPAD_REPORT_DESCRIPTOR.len() <= CONTROL_BUFFER_SIZE);
        assert!(CONFIGURATION_DESCRIPTOR.len() <= CONTROL_BUFFER_SIZE);
    }

    #[test]
    fn test_report_layout_rejects_malformed() {
        assert_eq!(report_layout(&[0xC0]), Err(DescriptorError::UnbalancedCollection));
        assert_eq!(report_layout(&[0xA1, 0x01]), Err(DescriptorError::UnbalancedCollection));
        assert_eq!(report_layout(&[0x26, 0xFF]), Err(DescriptorError::Truncated));
        assert_eq!(report_layout(&[0xFE, 0x00, 0x00]), Err(DescriptorError::LongItem));
    }

    #[test]
    fn test_serial_number() {
        assert_eq!(serial_number([1, 2, 3]), 6);
        assert_eq!(serial_number([0x1000_0000, 0x10, 1]), 0);
        assert_eq!(serial_number([0xffff_ffff, 0xffff_ffff, 1]), 1);
    }

    #[test]
    fn test_serial_hex() {
        assert_eq!(&serial_hex(0x0123_abcd), b"0123ABCD");
        assert_eq!(&serial_hex(0), b"00000000");
        assert_eq!(&serial_hex(u32::MAX), b"FFFFFFFF");
        assert_eq!(hex_str(&serial_hex(0xc0ffee)), "00C0FFEE");
    }

    #[test]
    fn test_encode_string() {
        let mut buf = [0u8; 32];
        let len = encode_string("arcin", &mut buf).unwrap();
        assert_eq!(len, 12);
        assert_eq!(&buf[..len], &[12, 3, b'a', 0, b'r', 0, b'c', 0, b'i', 0, b'n', 0]);

        let mut small = [0u8; 4];
        assert_eq!(encode_string("arcin", &mut small), None);
    }

    #[test]
    fn test_encode_langids() {
        let mut buf = [0u8; 8];
        let len = encode_langids(&[0x0409], &mut buf).unwrap();
        assert_eq!(&buf[..len], &[4u8, 3, 0x09, 0x04]);
    }
}
