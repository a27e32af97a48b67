#![no_std]
#![no_main]

use arcin_core::config::{ENCODER_CLEAR_ON_REVERSE, ENCODER_DEADZONE, ENCODER_SUSTAIN_MS};
use arcin_core::hid::{gamepad_function, keyboard_function, KeyboardFunction};
use arcin_core::{send_reports, serial_number, AnalogEncoder, ControlFlags, ReportComposer, SharedCounter};
use arcin_firmware::board::FLASH_SIZE;
use arcin_firmware::usb::{self, BoardGamepad, ReportEndpoint, UsbDriver};
use arcin_firmware::{
    track_quadrature, unique_id, BootloaderReset, MonotonicClock, PinBank, ReportSlot, SharedLeds,
    SlotTransport,
};
use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_rp::watchdog::Watchdog;
use embassy_usb::driver::Endpoint as _;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Reset request, LED timestamp and configured state, written by control handling.
static FLAGS: ControlFlags = ControlFlags::new();
static CLOCK: MonotonicClock = MonotonicClock;

/// Quadrature positions, written by the encoder tasks.
static ENCODER_COUNTERS: [SharedCounter; 2] = [SharedCounter::new(), SharedCounter::new()];

/// Latest unsent report per IN endpoint. Signal semantics: a newer report
/// replaces one the host has not collected yet.
static GAMEPAD_REPORTS: ReportSlot = ReportSlot::new();
static KEYBOARD_REPORTS: ReportSlot = ReportSlot::new();

static LEDS: StaticCell<SharedLeds> = StaticCell::new();
static GAMEPAD: StaticCell<BoardGamepad> = StaticCell::new();
static KEYBOARD: StaticCell<KeyboardFunction> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("arcin starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let _status = Output::new(p.PIN_25, Level::High);

    // --- Buttons and LEDs ---
    let buttons = PinBank::new([
        Input::new(p.PIN_0, Pull::Up),
        Input::new(p.PIN_1, Pull::Up),
        Input::new(p.PIN_2, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_4, Pull::Up),
        Input::new(p.PIN_5, Pull::Up),
        Input::new(p.PIN_6, Pull::Up),
        Input::new(p.PIN_7, Pull::Up),
        Input::new(p.PIN_8, Pull::Up),
        Input::new(p.PIN_9, Pull::Up),
        Input::new(p.PIN_10, Pull::Up),
    ]);
    let leds: &'static SharedLeds = LEDS.init(SharedLeds::new([
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_12, Level::Low),
        Output::new(p.PIN_13, Level::Low),
        Output::new(p.PIN_14, Level::Low),
        Output::new(p.PIN_15, Level::Low),
        Output::new(p.PIN_16, Level::Low),
        Output::new(p.PIN_17, Level::Low),
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
        Output::new(p.PIN_20, Level::Low),
        Output::new(p.PIN_21, Level::Low),
    ]));

    // --- Encoders ---
    spawner.spawn(
        encoder_task(
            Input::new(p.PIN_22, Pull::Up),
            Input::new(p.PIN_26, Pull::Up),
            &ENCODER_COUNTERS[0],
        )
        .unwrap(),
    );
    spawner.spawn(
        encoder_task(
            Input::new(p.PIN_27, Pull::Up),
            Input::new(p.PIN_28, Pull::Up),
            &ENCODER_COUNTERS[1],
        )
        .unwrap(),
    );

    // --- USB Setup ---
    let mut flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let serial = serial_number(unique_id(&mut flash));

    let usb = usb::init(
        Driver::new(p.USB, Irqs),
        serial,
        &FLAGS,
        GAMEPAD.init(gamepad_function(&FLAGS, leds, &CLOCK)),
        KEYBOARD.init(keyboard_function()),
    );

    spawner.spawn(usb_task(usb.device).unwrap());
    spawner.spawn(report_task(usb.gamepad, &GAMEPAD_REPORTS).unwrap());
    spawner.spawn(report_task(usb.keyboard, &KEYBOARD_REPORTS).unwrap());

    // --- Main loop ---
    let encoder = |counter| {
        AnalogEncoder::new(
            counter,
            ENCODER_DEADZONE,
            ENCODER_SUSTAIN_MS,
            ENCODER_CLEAR_ON_REVERSE,
        )
    };
    let mut composer = ReportComposer::new(
        buttons,
        leds,
        &CLOCK,
        &FLAGS,
        [encoder(&ENCODER_COUNTERS[0]), encoder(&ENCODER_COUNTERS[1])],
    );
    let mut transport = SlotTransport::new(&FLAGS, &GAMEPAD_REPORTS, &KEYBOARD_REPORTS);
    let mut reset = BootloaderReset::new(Watchdog::new(p.WATCHDOG));

    info!("arcin initialized, waiting for host...");

    loop {
        let iteration = composer.run_once(&mut transport, &mut reset);
        if let Some(Err(e)) = iteration.gamepad {
            warn!("Gamepad report dropped: {:?}", e);
        }
        if let Some(Err(e)) = iteration.keyboard {
            warn!("Keyboard report dropped: {:?}", e);
        }
        yield_now().await;
    }
}

/// USB device task - enumeration and the control pipe.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Report writer task - one per IN endpoint.
#[embassy_executor::task(pool_size = 2)]
async fn report_task(mut endpoint: ReportEndpoint, slot: &'static ReportSlot) {
    let address = endpoint.info().addr;
    loop {
        let e = send_reports(&mut endpoint, slot).await;
        warn!("Endpoint {:?} write failed: {:?}", address, e);
    }
}

/// Encoder task - software quadrature decoding.
#[embassy_executor::task(pool_size = 2)]
async fn encoder_task(a: Input<'static>, b: Input<'static>, counter: &'static SharedCounter) {
    track_quadrature(a, b, counter).await;
}
