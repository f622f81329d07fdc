//! Low-level SPI framing for the AS5048A.
//!
//! The sensor answers a command in the *following* frame, so one register
//! read is two chip-select phases: the first carries the command, the second
//! clocks the response out while filler bytes are sent.
//!
//! This module is crate-private. Consumers interact with
//! [`As5048a`](crate::As5048a) in `sensor.rs` instead.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

use crate::error::EncoderError;
use crate::registers::FILLER;

/// Owns the SPI bus and the manual chip-select line.
pub(crate) struct FrameDriver<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> FrameDriver<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Create the driver and park chip select in its inactive (high) state.
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        // A failing CS pin will surface on the first transaction.
        let _ = cs.set_high();
        Self { spi, cs }
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Force chip select inactive. Used after a transaction was cancelled
    /// mid-phase, e.g. by a timeout.
    pub fn deselect(&mut self) {
        let _ = self.cs.set_high();
    }

    /// Send a command word, then read the response word in a second frame.
    pub async fn exchange(&mut self, command: u16) -> Result<u16, EncoderError<SPI::Error, CS::Error>> {
        self.frame(command.to_be_bytes()).await?;
        let response = self.frame([FILLER, FILLER]).await?;
        Ok(u16::from_be_bytes(response))
    }

    /// One chip-select phase: assert, transfer two bytes high byte first,
    /// release. CS is released even when the bus fails.
    async fn frame(&mut self, tx: [u8; 2]) -> Result<[u8; 2], EncoderError<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(EncoderError::ChipSelect)?;

        let mut buf = tx;
        let transferred = match self.spi.transfer_in_place(&mut buf).await {
            Ok(()) => self.spi.flush().await,
            Err(e) => Err(e),
        };
        let released = self.cs.set_high();

        transferred.map_err(EncoderError::Spi)?;
        released.map_err(EncoderError::ChipSelect)?;
        Ok(buf)
    }
}
