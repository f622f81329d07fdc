//! 16-bit frame encoding and decoding.
//!
//! Frames travel high byte first. Both directions use even parity over all
//! 16 bits; a response with odd parity is a transmission fault and is
//! reported through [`Reading::parity_valid`], never as an error.

use crate::registers::{DATA_MASK, ERROR_FLAG, PARITY_BIT, READ_FLAG};

/// Returns `true` if `word` has an even number of set bits.
#[inline]
pub const fn has_even_parity(word: u16) -> bool {
    word.count_ones() % 2 == 0
}

/// Build the read command for a 14-bit register address.
///
/// Returns `None` for addresses outside `0..=0x3FFF`.
///
/// ```
/// use as5048a_driver::frame::read_command;
///
/// assert_eq!(read_command(0x3FFF), Some(0xFFFF));
/// assert_eq!(read_command(0x0001), Some(0x4001));
/// assert_eq!(read_command(0x4000), None);
/// ```
pub const fn read_command(address: u16) -> Option<u16> {
    if address > DATA_MASK {
        return None;
    }
    let command = READ_FLAG | address;
    if has_even_parity(command) {
        Some(command)
    } else {
        Some(command | PARITY_BIT)
    }
}

/// One response word read back from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    word: u16,
    parity_valid: bool,
}

impl Reading {
    /// Wrap a raw response word and check its parity.
    pub const fn from_word(word: u16) -> Self {
        Self {
            word,
            parity_valid: has_even_parity(word),
        }
    }

    /// The full 16-bit response, parity and error bits included.
    #[inline]
    pub const fn word(&self) -> u16 {
        self.word
    }

    #[inline]
    pub const fn parity_valid(&self) -> bool {
        self.parity_valid
    }

    /// The 14-bit data field.
    #[inline]
    pub const fn value(&self) -> u16 {
        self.word & DATA_MASK
    }

    /// The sensor's error flag (set after a framing, command or parity error
    /// on a previous command; cleared by reading `CLEAR_ERROR_FLAG`).
    #[inline]
    pub const fn error_flag(&self) -> bool {
        self.word & ERROR_FLAG != 0
    }
}

/// Decoded `DIAG_AGC` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    raw: u16,
}

impl Diagnostics {
    /// Decode a diagnostics reading. Returns `None` if its parity is bad.
    pub const fn from_reading(reading: &Reading) -> Option<Self> {
        if reading.parity_valid() {
            Some(Self {
                raw: reading.value(),
            })
        } else {
            None
        }
    }

    /// Automatic gain control value; 0 means a strong field, 255 a weak one.
    #[inline]
    pub const fn agc(&self) -> u8 {
        (self.raw & 0x00FF) as u8
    }

    /// Offset compensation finished.
    #[inline]
    pub const fn ocf(&self) -> bool {
        self.raw & (1 << 8) != 0
    }

    /// CORDIC overflow; the angle output is invalid while set.
    #[inline]
    pub const fn cordic_overflow(&self) -> bool {
        self.raw & (1 << 9) != 0
    }

    /// Magnetic field too strong.
    #[inline]
    pub const fn comp_low(&self) -> bool {
        self.raw & (1 << 10) != 0
    }

    /// Magnetic field too weak.
    #[inline]
    pub const fn comp_high(&self) -> bool {
        self.raw & (1 << 11) != 0
    }

    /// `true` when the angle output can be trusted.
    pub const fn field_ok(&self) -> bool {
        self.ocf() && !self.cordic_overflow() && !self.comp_low() && !self.comp_high()
    }
}
