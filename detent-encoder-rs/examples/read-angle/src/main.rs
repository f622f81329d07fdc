//! Angle readout example
//!
//! Demonstrates basic usage of the as5048a-driver crate on the Raspberry Pi
//! Pico 2. Reads the angle register every 100 ms and logs the 14-bit value,
//! flagging parity failures. Diagnostics are checked once at startup.
//!
//! # Wiring
//!
//! | Signal    | Pico 2 Pin | Notes                        |
//! |-----------|------------|------------------------------|
//! | SPI0 SCK  | GP18       |                              |
//! | SPI0 MOSI | GP19       |                              |
//! | SPI0 MISO | GP16       |                              |
//! | CSn       | GP17       | Driven manually, idle high   |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp as hal;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::{self, Phase, Polarity, Spi};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use as5048a_driver::As5048a;

/// Tell the Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

const READ_TIMEOUT: Duration = Duration::from_millis(5);

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // --- SPI bus, mode 1 ---
    let mut config = spi::Config::default();
    config.frequency = 1_000_000;
    config.polarity = Polarity::IdleLow;
    config.phase = Phase::CaptureOnSecondTransition;

    let spi = Spi::new(
        p.SPI0,
        p.PIN_18, // SCK
        p.PIN_19, // MOSI
        p.PIN_16, // MISO
        p.DMA_CH0,
        p.DMA_CH1,
        config,
    );
    let cs = Output::new(p.PIN_17, Level::High);

    let mut sensor = As5048a::new(spi, cs);

    match sensor.read_diagnostics().await {
        Ok(Some(diag)) if diag.field_ok() => info!("Field OK, AGC = {}", diag.agc()),
        Ok(Some(diag)) => warn!("Magnet out of range: {}", diag),
        Ok(None) => warn!("Diagnostics parity failure"),
        Err(e) => error!("Diagnostics read failed: {}", e),
    }

    info!("Angle readout started, rotate the magnet");

    loop {
        match sensor.read_angle_within(READ_TIMEOUT).await {
            Ok(reading) if reading.parity_valid() => info!("Angle: {=u16}", reading.value()),
            Ok(reading) => warn!("Parity failure, word {=u16:#x}", reading.word()),
            Err(e) => error!("Read failed: {}", e),
        }

        Timer::after(Duration::from_millis(100)).await;
    }
}
