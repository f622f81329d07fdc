//! detent-firmware
//!
//! Haptic detent knob firmware for the Raspberry Pi Pico 2. Wires the
//! `as5048a-driver` and `detent` crates to the RP2350 peripherals:
//!
//! 1. The control loop runs in the main task. Every iteration it polls the
//!    [`Controller`], which samples the AS5048A and the current sense ADC on
//!    the fast cadence and drives the motor PWM on the slow one.
//! 2. A receive task decodes host request frames from UART0 and hands them
//!    to the loop through a one-slot channel.
//! 3. A transmit task writes the framed responses back.
//!
//! # Wiring
//!
//! | Signal       | Pico 2 Pin | Notes                              |
//! |--------------|------------|------------------------------------|
//! | SPI0 SCK     | GP18       | AS5048A CLK                        |
//! | SPI0 MOSI    | GP19       | AS5048A MOSI                       |
//! | SPI0 MISO    | GP16       | AS5048A MISO                       |
//! | ENC CSn      | GP17       | Driven manually, idle high         |
//! | MOTOR PWM    | GP14       | PWM slice 7 channel A              |
//! | MOTOR DIR    | GP15       | Low = forward                      |
//! | CURRENT SNS  | GP26       | ADC0, shunt amplifier output       |
//! | UART0 TX     | GP0        | To host, 115200 8N1                |
//! | UART0 RX     | GP1        | From host                          |

#![no_std]
#![no_main]

mod board;
mod host;

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_rp::adc::{self, Adc};
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Phase as SpiPhase, Polarity, Spi};
use embassy_rp::uart::{self, BufferedInterruptHandler, BufferedUart, BufferedUartRx, BufferedUartTx};
use embassy_time::{Duration, Instant, TICK_HZ};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use as5048a_driver::As5048a;
use detent::estimator::CurrentConfig;
use detent::{Controller, ControllerConfig};

use crate::board::{AdcCurrent, PwmMotor, TimedEncoder};
use crate::host::{ChannelLink, LINK_READY, REQUESTS, RESPONSES};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// Wire the UART0 interrupt to Embassy's buffered handler.
bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

static UART_TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// RP2350 ADC: 12-bit right-aligned, amplifier biased at half scale.
const CURRENT: CurrentConfig = CurrentConfig {
    zero_offset: 0x07FF,
    adc_shift: 0,
};

fn controller_config() -> ControllerConfig {
    ControllerConfig {
        clock_hz: TICK_HZ,
        current: CURRENT,
        ..ControllerConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Thin wrapper that monomorphises the generic `receive_requests` so it can
/// be spawned as a concrete Embassy task.
#[embassy_executor::task]
async fn host_rx_task(rx: BufferedUartRx) {
    host::receive_requests(rx, &REQUESTS, &LINK_READY).await;
}

/// Thin wrapper around the generic `transmit_responses`.
#[embassy_executor::task]
async fn host_tx_task(tx: BufferedUartTx) {
    host::transmit_responses(tx, &RESPONSES).await;
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("detent-firmware starting");

    let config = controller_config();

    // —— Angle sensor: SPI0 mode 1, 1 MHz ——————————————————————————————————
    let mut spi_config = spi::Config::default();
    spi_config.frequency = 1_000_000;
    spi_config.polarity = Polarity::IdleLow;
    spi_config.phase = SpiPhase::CaptureOnSecondTransition;

    let spi = Spi::new(
        p.SPI0,
        p.PIN_18, // SCK
        p.PIN_19, // MOSI
        p.PIN_16, // MISO
        p.DMA_CH0,
        p.DMA_CH1,
        spi_config,
    );
    let cs = Output::new(p.PIN_17, Level::High);
    let mut encoder = TimedEncoder::new(
        As5048a::new(spi, cs),
        Duration::from_micros(u64::from(config.bus_timeout_us)),
    );
    encoder.report_diagnostics().await;

    // —— Current sense: ADC0 ————————————————————————————————————————————————
    let adc = Adc::new_blocking(p.ADC, adc::Config::default());
    let channel = adc::Channel::new_pin(p.PIN_26, Pull::None);
    let current = AdcCurrent::new(adc, channel);

    // —— Motor: PWM slice 7 A + direction pin ————————————————————————————————
    let pwm = Pwm::new_output_a(p.PWM_SLICE7, p.PIN_14, pwm::Config::default());
    let direction = Output::new(p.PIN_15, Level::Low);
    let motor = PwmMotor::new(pwm, pwm::Config::default(), direction);

    // —— Host link: UART0 ——————————————————————————————————————————————————
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = 115_200;
    let uart = BufferedUart::new(
        p.UART0,
        p.PIN_0, // TX
        p.PIN_1, // RX
        Irqs,
        UART_TX_BUF.init([0; 64]),
        UART_RX_BUF.init([0; 64]),
        uart_config,
    );
    let (tx, rx) = uart.split();

    // —— Spawn tasks ————————————————————————————————————————————————————————
    spawner.spawn(host_rx_task(rx).unwrap());
    spawner.spawn(host_tx_task(tx).unwrap());

    // —— Control loop ——————————————————————————————————————————————————————
    let link = ChannelLink::new(&REQUESTS, &RESPONSES, &LINK_READY);
    let mut controller = Controller::new(encoder, current, motor, link, config);

    info!("Control loop running");
    loop {
        controller.poll(Instant::now().as_ticks()).await;
        yield_now().await;
    }
}
