//! Glue between the core and the `embassy-usb` device stack.
//!
//! The stack owns enumeration: addressing, configuration, interface and
//! endpoint-halt requests, and chunking of control data stages. The core
//! stays the source of truth for everything the host sees:
//!
//! - [`usb_config`] and [`add_hid_interface`] register the device and HID
//!   interfaces so the builder emits the same bytes as
//!   [`CONFIGURATION_DESCRIPTOR`](crate::descriptor::CONFIGURATION_DESCRIPTOR);
//! - [`UsbControl`] forwards interface-addressed requests to the
//!   [`ControlDispatcher`] and tracks the configured state;
//! - [`ReportSlot`] / [`SlotTransport`] implement [`Transport`] with
//!   "latest report wins" semantics, drained by [`send_reports`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::control::{InResponse, OutResponse, Recipient as UsbRecipient, Request, RequestType};
use embassy_usb::driver::{Direction, Driver, Endpoint, EndpointAddress, EndpointError, EndpointIn};
use embassy_usb::types::StringIndex;
use embassy_usb::{Builder, Config, Handler};
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::{
    CONTROL_MAX_PACKET, GAMEPAD_ENDPOINT, KEYBOARD_ENDPOINT, REPORT_MAX_PACKET, REPORT_POLL_MS,
    USB_DEVICE_RELEASE, USB_MANUFACTURER, USB_PID, USB_PRODUCT, USB_VID,
};
use crate::control::{ControlDispatcher, ControlResponse, SetupPacket, SetupStatus};
use crate::descriptor::{CLASS_HID, DESCRIPTOR_HID};
use crate::flags::ControlFlags;
use crate::hal::{Transport, TransportError};
use crate::hid::{HidFunction, ReportHandler};

/// Device-level configuration: class 0 (per interface), no IADs,
/// self-powered, serial number `serial`.
#[must_use]
pub fn usb_config(serial: &str) -> Config<'_> {
    let mut config = Config::new(USB_VID, USB_PID);
    config.device_release = USB_DEVICE_RELEASE;
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some(serial);
    config.max_packet_size_0 = CONTROL_MAX_PACKET;
    config.self_powered = true;
    config.supports_remote_wakeup = false;
    config.max_power = 0;
    config.composite_with_iads = false;
    config.device_class = 0;
    config.device_sub_class = 0;
    config.device_protocol = 0;
    config
}

/// Register `function` as the next interface: HID class descriptor plus
/// its interrupt IN endpoint.
///
/// Interfaces are numbered in call order, so register the gamepad first.
pub fn add_hid_interface<'d, D, H>(builder: &mut Builder<'d, D>, function: &HidFunction<H>) -> D::EndpointIn
where
    D: Driver<'d>,
    H: ReportHandler,
{
    let mut func = builder.function(CLASS_HID, 0, 0);
    let mut interface = func.interface();
    debug_assert_eq!(u8::from(interface.interface_number()), function.interface());
    let mut alt = interface.alt_setting(CLASS_HID, 0, 0, None);
    alt.descriptor(DESCRIPTOR_HID, &function.hid_descriptor()[2..]);
    alt.endpoint_interrupt_in(
        Some(EndpointAddress::from(function.endpoint())),
        REPORT_MAX_PACKET,
        REPORT_POLL_MS,
    )
}

/// Rebuild the wire form of an interface-addressed request.
fn interface_setup(req: &Request) -> Option<SetupPacket> {
    if req.recipient != UsbRecipient::Interface {
        return None;
    }
    let direction = match req.direction {
        Direction::In => 0x80,
        Direction::Out => 0x00,
    };
    let kind = match req.request_type {
        RequestType::Standard => 0x00,
        RequestType::Class => 0x20,
        RequestType::Vendor => 0x40,
        _ => 0x60,
    };
    Some(SetupPacket {
        request_type: direction | kind | 0x01,
        request: req.request,
        value: req.value,
        index: req.index,
        length: req.length,
    })
}

/// `embassy-usb` handler wrapping the class dispatcher.
pub struct UsbControl<'a> {
    dispatcher: ControlDispatcher<'a>,
    flags: &'a ControlFlags,
}

impl<'a> UsbControl<'a> {
    pub fn new(dispatcher: ControlDispatcher<'a>, flags: &'a ControlFlags) -> Self {
        Self { dispatcher, flags }
    }
}

impl Handler for UsbControl<'_> {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            self.flags.set_configured(false);
        }
    }

    fn reset(&mut self) {
        self.flags.set_configured(false);
    }

    fn configured(&mut self, configured: bool) {
        self.flags.set_configured(configured);
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        let setup = interface_setup(&req)?;
        let mut response = ControlResponse::new(0);
        match self.dispatcher.handle_setup(&setup, data, &mut response) {
            SetupStatus::Ok => Some(OutResponse::Accepted),
            SetupStatus::Fail => Some(OutResponse::Rejected),
            SetupStatus::Unhandled => None,
        }
    }

    fn control_in<'b>(&'b mut self, req: Request, buf: &'b mut [u8]) -> Option<InResponse<'b>> {
        let setup = interface_setup(&req)?;
        let mut response = ControlResponse::new(setup.length);
        match self.dispatcher.handle_setup(&setup, &[], &mut response) {
            SetupStatus::Ok => {
                let bytes = response.as_bytes();
                match buf.get_mut(..bytes.len()) {
                    Some(out) => {
                        out.copy_from_slice(bytes);
                        Some(InResponse::Accepted(out))
                    }
                    None => Some(InResponse::Rejected),
                }
            }
            SetupStatus::Fail => Some(InResponse::Rejected),
            SetupStatus::Unhandled => None,
        }
    }

    fn get_string(&mut self, index: StringIndex, _lang_id: u16) -> Option<&str> {
        self.dispatcher.string(u8::from(index))
    }
}

/// One IN report, at most one packet.
pub type ReportPacket = Vec<u8, { REPORT_MAX_PACKET as usize }>;

/// Hand-off cell between the main loop and one endpoint writer.
///
/// Holds at most one unsent report; a newer report replaces it. The slot is
/// idle only when nothing is pending and no write is in flight.
pub struct ReportSlot<M: RawMutex> {
    pending: Signal<M, ReportPacket>,
    busy: AtomicBool,
}

impl<M: RawMutex> ReportSlot<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
            busy: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.busy.load(Ordering::Acquire) && !self.pending.signaled()
    }

    /// Replace any unsent report with `packet`.
    pub fn submit(&self, packet: ReportPacket) {
        self.pending.signal(packet);
    }

    /// Wait for a report and mark the endpoint busy until [`finish`](Self::finish).
    pub async fn begin(&self) -> ReportPacket {
        let packet = self.pending.wait().await;
        self.busy.store(true, Ordering::Release);
        packet
    }

    pub fn finish(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl<M: RawMutex> Default for ReportSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write reports from `slot` to `endpoint` once it is enabled, until a
/// write fails.
pub async fn send_reports<M, E>(endpoint: &mut E, slot: &ReportSlot<M>) -> EndpointError
where
    M: RawMutex,
    E: EndpointIn,
{
    endpoint.wait_enabled().await;
    loop {
        let packet = slot.begin().await;
        let result = endpoint.write(&packet).await;
        slot.finish();
        if let Err(e) = result {
            return e;
        }
    }
}

/// [`Transport`] over the two report slots.
pub struct SlotTransport<'a, M: RawMutex> {
    flags: &'a ControlFlags,
    gamepad: &'a ReportSlot<M>,
    keyboard: &'a ReportSlot<M>,
}

impl<'a, M: RawMutex> SlotTransport<'a, M> {
    pub fn new(flags: &'a ControlFlags, gamepad: &'a ReportSlot<M>, keyboard: &'a ReportSlot<M>) -> Self {
        Self {
            flags,
            gamepad,
            keyboard,
        }
    }

    fn slot(&self, ep: u8) -> Option<&'a ReportSlot<M>> {
        match ep {
            GAMEPAD_ENDPOINT => Some(self.gamepad),
            KEYBOARD_ENDPOINT => Some(self.keyboard),
            _ => None,
        }
    }
}

impl<M: RawMutex> Transport for SlotTransport<'_, M> {
    fn ep_ready(&self, ep: u8) -> bool {
        self.flags.is_configured() && self.slot(ep).is_some_and(ReportSlot::is_idle)
    }

    fn write(&mut self, ep: u8, data: &[u8]) -> Result<(), TransportError> {
        let slot = self.slot(ep).ok_or(TransportError::Io)?;
        let packet = ReportPacket::from_slice(data).map_err(|_| TransportError::Io)?;
        slot.submit(packet);
        Ok(())
    }
}
