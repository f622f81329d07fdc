//! Error types for the encoder driver.

use core::fmt;

/// Errors that can occur when talking to the sensor.
///
/// A response with bad parity is **not** an error; it comes back as a
/// [`Reading`](crate::Reading) with `parity_valid() == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderError<S, P> {
    /// Underlying SPI bus error.
    Spi(S),

    /// Chip-select pin could not be driven.
    ChipSelect(P),

    /// The transaction did not finish within the allotted time.
    Timeout,

    /// Register address outside the 14-bit range.
    InvalidAddress,
}

impl<S: fmt::Debug, P: fmt::Debug> fmt::Display for EncoderError<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncoderError::Spi(e) => write!(f, "SPI error: {:?}", e),
            EncoderError::ChipSelect(e) => write!(f, "chip-select error: {:?}", e),
            EncoderError::Timeout => write!(f, "encoder transaction timed out"),
            EncoderError::InvalidAddress => write!(f, "register address exceeds 14 bits"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<S: defmt::Format, P: defmt::Format> defmt::Format for EncoderError<S, P> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            EncoderError::Spi(e) => defmt::write!(f, "SPI error: {}", e),
            EncoderError::ChipSelect(e) => defmt::write!(f, "Chip-select error: {}", e),
            EncoderError::Timeout => defmt::write!(f, "Encoder transaction timed out"),
            EncoderError::InvalidAddress => defmt::write!(f, "Invalid register address"),
        }
    }
}
