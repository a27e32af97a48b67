//! Compile-time configuration.
//!
//! USB identity, endpoint layout, timing parameters and the keyboard
//! scan-code table live here so they can be tuned in one place.

// USB identity

/// OpenMoko community VID with the arcin PID.
pub const USB_VID: u16 = 0x1d50;
pub const USB_PID: u16 = 0x6080;

/// Device release number (BCD).
pub const USB_DEVICE_RELEASE: u16 = 0x0110;

/// USB specification release (BCD).
pub const USB_SPEC_RELEASE: u16 = 0x0200;

/// HID class specification release (BCD).
pub const HID_SPEC_RELEASE: u16 = 0x0111;

/// Maximum packet size of the default control endpoint.
pub const CONTROL_MAX_PACKET: u8 = 64;

/// Language ID advertised in string descriptor 0 (US English).
pub const USB_LANGID: u16 = 0x0409;

pub const USB_MANUFACTURER: &str = "zyp";
pub const USB_PRODUCT: &str = "arcin";

pub const STRING_INDEX_MANUFACTURER: u8 = 1;
pub const STRING_INDEX_PRODUCT: u8 = 2;
pub const STRING_INDEX_SERIAL: u8 = 3;

// Interfaces and endpoints

pub const GAMEPAD_INTERFACE: u8 = 0;
pub const KEYBOARD_INTERFACE: u8 = 1;

/// IN endpoint addresses (direction bit set).
pub const GAMEPAD_ENDPOINT: u8 = 0x81;
pub const KEYBOARD_ENDPOINT: u8 = 0x82;

/// Interrupt endpoint max packet size (bytes).
pub const REPORT_MAX_PACKET: u16 = 16;

/// Interrupt endpoint polling interval (ms).
pub const REPORT_POLL_MS: u8 = 1;

/// Size of the control data-stage buffer. Must hold the largest descriptor.
pub const CONTROL_BUFFER_SIZE: usize = 384;

/// Maximum number of class drivers the dispatcher can hold.
pub const MAX_CLASS_DRIVERS: usize = 4;

// Inputs

/// Number of physical buttons (and LEDs).
pub const BUTTON_COUNT: usize = 11;

/// Mask covering every button bit.
pub const BUTTON_MASK: u16 = (1 << BUTTON_COUNT) - 1;

/// Encoder ticks required before motion is recognised.
pub const ENCODER_DEADZONE: u8 = 4;

/// How long a detected direction is held without further motion (ms).
pub const ENCODER_SUSTAIN_MS: u32 = 100;

/// Report one idle poll before a direction reversal.
pub const ENCODER_CLEAR_ON_REVERSE: bool = true;

// Timing

/// Host LED writes take precedence over button passthrough for this long (ms).
pub const LED_HOST_OVERRIDE_MS: u32 = 1000;

/// Delay before the bootloader hand-off so the control status stage can complete (ms).
pub const RESET_DELAY_MS: u32 = 10;

/// Reset reason persisted across the warm reset to select the bootloader.
pub const BOOTLOADER_REASON: u32 = 0xb007;

// Feature report commands

/// No-op feature command.
pub const FEATURE_NOP: u8 = 0x00;

/// Request a warm reset into the bootloader.
pub const FEATURE_RESET_BOOTLOADER: u8 = 0x10;

// Keyboard scan codes (USB HID usage page 0x07)

/// Scan code of the first button; buttons 0..=8 map to consecutive codes (A..I).
pub const SCAN_FIRST_BUTTON: u8 = 0x04;

/// Number of buttons mapped to consecutive scan codes.
pub const SEQUENTIAL_BUTTONS: usize = 9;

/// Button 9 (start).
pub const SCAN_START: u8 = 0x28; // ENTER

/// Button 10 (select).
pub const SCAN_SELECT: u8 = 0x2a; // BACKSPACE

/// Encoder 1 reverse / forward (V / W).
pub const SCAN_ENCODER1: (u8, u8) = (0x19, 0x1a);

/// Encoder 2 reverse / forward (N / O).
pub const SCAN_ENCODER2: (u8, u8) = (0x11, 0x12);
