//! High-level interface for the AS5048A magnetic angle sensor.
//!
//! [`As5048a`] wraps the low-level SPI framing with address validation,
//! parity checking, named register reads, and a timeout-bounded read for
//! callers that must never block.

use embassy_time::{with_timeout, Duration};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

use crate::driver::FrameDriver;
use crate::error::EncoderError;
use crate::frame::{read_command, Diagnostics, Reading};
use crate::registers::{ANGLE, CLEAR_ERROR_FLAG, DIAG_AGC, MAGNITUDE};

/// Async driver for an AS5048A on a dedicated SPI bus.
///
/// Chip select is driven manually because a read spans two frames with a
/// CS release in between.
///
/// # Example
///
/// ```ignore
/// use as5048a_driver::As5048a;
///
/// // `spi` is any `embedded-hal-async` SPI bus in mode 1, `cs` an output pin
/// let mut sensor = As5048a::new(spi, cs);
///
/// let reading = sensor.read_angle().await?;
/// if reading.parity_valid() {
///     let counts = reading.value(); // 0..=0x3FFF
/// }
/// ```
pub struct As5048a<SPI, CS> {
    driver: FrameDriver<SPI, CS>,
}

impl<SPI, CS> As5048a<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Create a new sensor interface.
    ///
    /// # Arguments
    /// * `spi` — SPI bus, 8-bit words, mode 1 (CPOL = 0, CPHA = 1)
    /// * `cs` — active-low chip-select pin, parked high here
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self {
            driver: FrameDriver::new(spi, cs),
        }
    }

    /// Give back the bus and pin.
    pub fn release(self) -> (SPI, CS) {
        self.driver.release()
    }

    // -----------------------------------------------------------------------
    // Register access
    // -----------------------------------------------------------------------

    /// Read any 14-bit register.
    ///
    /// A response with odd parity is returned as a [`Reading`] with
    /// `parity_valid() == false`. The caller decides what to substitute; the
    /// read is not retried here.
    ///
    /// # Errors
    /// * [`EncoderError::InvalidAddress`] if `address > 0x3FFF`
    /// * [`EncoderError::Spi`] / [`EncoderError::ChipSelect`] on bus failure
    pub async fn read_register(
        &mut self,
        address: u16,
    ) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        let command = read_command(address).ok_or(EncoderError::InvalidAddress)?;
        let word = self.driver.exchange(command).await?;
        Ok(Reading::from_word(word))
    }

    /// [`read_register`](Self::read_register) bounded by `timeout`.
    ///
    /// On expiry the in-flight transaction is dropped, chip select is
    /// released, and [`EncoderError::Timeout`] is returned.
    pub async fn read_register_within(
        &mut self,
        address: u16,
        timeout: Duration,
    ) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        match with_timeout(timeout, self.read_register(address)).await {
            Ok(result) => result,
            Err(_) => {
                self.driver.deselect();
                #[cfg(feature = "defmt")]
                defmt::warn!("AS5048A read of {=u16:#x} timed out", address);
                Err(EncoderError::Timeout)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Named registers
    // -----------------------------------------------------------------------

    /// Read the angle register (after the OTP zero position adder).
    pub async fn read_angle(&mut self) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        self.read_register(ANGLE).await
    }

    /// Angle read bounded by `timeout`.
    pub async fn read_angle_within(
        &mut self,
        timeout: Duration,
    ) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        self.read_register_within(ANGLE, timeout).await
    }

    /// Read the CORDIC magnitude register.
    pub async fn read_magnitude(
        &mut self,
    ) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        self.read_register(MAGNITUDE).await
    }

    /// Read and decode the diagnostics register.
    ///
    /// Returns `Ok(None)` if the response parity was bad.
    pub async fn read_diagnostics(
        &mut self,
    ) -> Result<Option<Diagnostics>, EncoderError<SPI::Error, CS::Error>> {
        let reading = self.read_register(DIAG_AGC).await?;
        Ok(Diagnostics::from_reading(&reading))
    }

    /// Read the error register, which clears the sensor's error flag.
    ///
    /// The returned value holds the framing (bit 0), command-invalid (bit 1)
    /// and parity (bit 2) error bits that were pending.
    pub async fn clear_error_flag(
        &mut self,
    ) -> Result<Reading, EncoderError<SPI::Error, CS::Error>> {
        self.read_register(CLEAR_ERROR_FLAG).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCs, MockSpi, PinEvent};
    use embassy_futures::block_on;
    use embassy_time::{Instant, MockDriver};

    #[test]
    fn read_angle_sends_angle_command() {
        // 0x1234 has 5 bits set; add the parity bit for a valid frame.
        let mut sensor = As5048a::new(MockSpi::answering(&[0x9234]), MockCs::default());

        let reading = block_on(sensor.read_angle()).unwrap();
        assert!(reading.parity_valid());
        assert_eq!(reading.value(), 0x1234);

        let (spi, _) = sensor.release();
        assert_eq!(&spi.sent[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn parity_failure_is_not_an_error() {
        let mut sensor = As5048a::new(MockSpi::answering(&[0x1234]), MockCs::default());

        let reading = block_on(sensor.read_angle()).unwrap();
        assert!(!reading.parity_valid());
    }

    #[test]
    fn invalid_address_rejected_without_bus_traffic() {
        let mut sensor = As5048a::new(MockSpi::default(), MockCs::default());

        let result = block_on(sensor.read_register(0x4000));
        assert_eq!(result, Err(EncoderError::InvalidAddress));

        let (spi, cs) = sensor.release();
        assert!(spi.sent.is_empty());
        // Only the initial park-high.
        assert_eq!(cs.events.len(), 1);
    }

    #[test]
    fn diagnostics_are_decoded() {
        let mut sensor = As5048a::new(MockSpi::answering(&[0x0180]), MockCs::default());

        let diag = block_on(sensor.read_diagnostics()).unwrap().unwrap();
        assert!(diag.ocf());
        assert_eq!(diag.agc(), 0x80);

        let (spi, _) = sensor.release();
        assert_eq!(&spi.sent[..2], &[0x7F, 0xFD]);
    }

    #[test]
    fn clear_error_flag_reads_error_register() {
        // Parity error bit pending (bit 2) plus parity bit.
        let mut sensor = As5048a::new(MockSpi::answering(&[0x8004]), MockCs::default());

        let reading = block_on(sensor.clear_error_flag()).unwrap();
        assert_eq!(reading.value(), 0x0004);

        let (spi, _) = sensor.release();
        assert_eq!(&spi.sent[..2], &[0x40, 0x01]);
    }

    // ── Bounded reads ────────────────────────────────────────────────

    #[test]
    fn stalled_bus_times_out_and_releases_cs() {
        // The response frame never completes.
        let mut sensor = As5048a::new(MockSpi::stalling_at(1), MockCs::default());

        MockDriver::get().reset();
        let start = Instant::now();
        let result = block_on(sensor.read_angle_within(Duration::from_micros(500)));

        assert_eq!(result, Err(EncoderError::Timeout));
        assert!(Instant::now() - start >= Duration::from_micros(500));

        let (spi, cs) = sensor.release();
        // The command frame went out before the stall.
        assert_eq!(&spi.sent[..2], &[0xFF, 0xFF]);
        assert_eq!(cs.events.last(), Some(&PinEvent::High));
        assert!(!cs.is_low());
    }

    #[test]
    fn bounded_read_completes_within_deadline() {
        let mut sensor = As5048a::new(MockSpi::answering(&[0x9234]), MockCs::default());

        let reading = block_on(sensor.read_register_within(ANGLE, Duration::from_micros(500)));
        assert_eq!(reading.map(|r| r.value()), Ok(0x1234));
    }

    #[test]
    fn consecutive_reads_are_independent() {
        let mut sensor = As5048a::new(
            MockSpi::answering(&[0x0003, 0x0001]),
            MockCs::default(),
        );

        assert!(block_on(sensor.read_angle()).unwrap().parity_valid());
        assert!(!block_on(sensor.read_magnitude()).unwrap().parity_valid());
    }
}
