//! ReportComposer: one main-loop iteration from pins to IN reports.
//!
//! Each [`ReportComposer::run_once`] call, in order:
//!
//! 1. samples the buttons (active-low pins to an active-high mask);
//! 2. performs the pending bootloader hand-off, if the host asked for one;
//! 3. mirrors the buttons onto the LEDs unless the host wrote them recently;
//! 4. submits a gamepad report if that endpoint is ready;
//! 5. polls both encoders and submits a keyboard report if that endpoint is
//!    ready.
//!
//! The two endpoint writes are independent; a busy endpoint is simply
//! skipped until the next iteration.

use crate::config::{
    BOOTLOADER_REASON, GAMEPAD_ENDPOINT, KEYBOARD_ENDPOINT, LED_HOST_OVERRIDE_MS, RESET_DELAY_MS,
    SCAN_ENCODER1, SCAN_ENCODER2, SCAN_FIRST_BUTTON, SCAN_SELECT, SCAN_START, SEQUENTIAL_BUTTONS,
};
use crate::encoder::{deadline_reached, AnalogEncoder};
use crate::flags::ControlFlags;
use crate::hal::{ButtonInputs, Clock, Counter, LedOutputs, ResetControl, Transport, TransportError};
use crate::types::{Buttons, Direction, GamepadReport, KeyboardReport};

/// Keyboard report for the given buttons and encoder directions.
///
/// Slots fill in order: buttons 0-8, start, select, encoder 1, encoder 2.
#[must_use]
pub fn compose_keyboard(buttons: Buttons, encoder1: Direction, encoder2: Direction) -> KeyboardReport {
    let mut report = KeyboardReport::empty();

    for index in 0..SEQUENTIAL_BUTTONS {
        if buttons.is_pressed(index) {
            report.press(SCAN_FIRST_BUTTON + index as u8);
        }
    }
    if buttons.contains(Buttons::START) {
        report.press(SCAN_START);
    }
    if buttons.contains(Buttons::SELECT) {
        report.press(SCAN_SELECT);
    }
    if let Some(code) = encoder1.scan_code(SCAN_ENCODER1) {
        report.press(code);
    }
    if let Some(code) = encoder2.scan_code(SCAN_ENCODER2) {
        report.press(code);
    }

    report
}

/// What a single iteration did. Returned for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Iteration {
    pub buttons: Buttons,
    /// LEDs were driven from the buttons this iteration.
    pub leds_mirrored: bool,
    /// The bootloader hand-off was issued this iteration.
    pub reset_issued: bool,
    /// `None` when the gamepad endpoint was busy.
    pub gamepad: Option<Result<GamepadReport, TransportError>>,
    /// `None` when the keyboard endpoint was busy.
    pub keyboard: Option<Result<KeyboardReport, TransportError>>,
}

/// Main-loop state: the debounced encoders plus the shared HAL handles.
pub struct ReportComposer<'a, B, L, K, C> {
    buttons: B,
    leds: &'a L,
    clock: &'a K,
    flags: &'a ControlFlags,
    encoders: [AnalogEncoder<C>; 2],
    reset_issued: bool,
}

impl<'a, B, L, K, C> ReportComposer<'a, B, L, K, C>
where
    B: ButtonInputs,
    L: LedOutputs,
    K: Clock,
    C: Counter,
{
    /// Create a composer over already-centred encoders.
    pub fn new(
        buttons: B,
        leds: &'a L,
        clock: &'a K,
        flags: &'a ControlFlags,
        encoders: [AnalogEncoder<C>; 2],
    ) -> Self {
        Self {
            buttons,
            leds,
            clock,
            flags,
            encoders,
            reset_issued: false,
        }
    }

    /// Run one iteration against `transport`, handing off through `reset`
    /// when the host requested the bootloader.
    pub fn run_once<T, R>(&mut self, transport: &mut T, reset: &mut R) -> Iteration
    where
        T: Transport,
        R: ResetControl,
    {
        let buttons = Buttons::from_active_low(self.buttons.levels());

        let reset_issued = self.service_reset(reset);

        // Clock is read under the LED lock so a host write stamped after it
        // can never look like it lies in the future.
        let (clock, flags) = (self.clock, self.flags);
        let leds_mirrored = self.leds.mirror_unless(buttons.raw(), || {
            flags.host_owns_leds(clock.now_ms(), LED_HOST_OVERRIDE_MS)
        });

        let gamepad = transport.ep_ready(GAMEPAD_ENDPOINT).then(|| {
            let report = GamepadReport {
                buttons,
                axis_x: self.encoders[0].raw(),
                axis_y: self.encoders[1].raw(),
            };
            transport
                .write(GAMEPAD_ENDPOINT, &report.as_bytes())
                .map(|()| report)
        });

        let keyboard = transport.ep_ready(KEYBOARD_ENDPOINT).then(|| {
            let now = self.clock.now_ms();
            let encoder1 = self.encoders[0].poll(now);
            let encoder2 = self.encoders[1].poll(now);
            let report = compose_keyboard(buttons, encoder1, encoder2);
            transport
                .write(KEYBOARD_ENDPOINT, report.as_bytes())
                .map(|()| report)
        });

        Iteration {
            buttons,
            leds_mirrored,
            reset_issued,
            gamepad,
            keyboard,
        }
    }

    /// Let the in-flight control status stage drain, then reset once.
    fn service_reset<R: ResetControl>(&mut self, reset: &mut R) -> bool {
        if self.reset_issued || !self.flags.reset_requested() {
            return false;
        }
        let deadline = self.clock.now_ms().wrapping_add(RESET_DELAY_MS);
        while !deadline_reached(self.clock.now_ms(), deadline) {
            core::hint::spin_loop();
        }
        self.reset_issued = true;
        reset.request_warm_reset(BOOTLOADER_REASON);
        true
    }

    /// Debounced encoder, 0 or 1.
    #[inline]
    pub fn encoder(&self, index: usize) -> Option<&AnalogEncoder<C>> {
        self.encoders.get(index)
    }

    #[inline]
    #[must_use]
    pub fn reset_issued(&self) -> bool {
        self.reset_issued
    }
}
