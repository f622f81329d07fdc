//! Register map and frame constants for the AS5048A.
//!
//! Every register is addressed with 14 bits. A read command is the address
//! with bit 14 set; bit 15 carries even parity over the whole word:
//! `[PAR | R/W | ADDR13..ADDR0]`.

// ---------------------------------------------------------------------------
// Registers
// ---------------------------------------------------------------------------

/// No-operation register, reads back as 0.
pub const NOP: u16 = 0x0000;

/// Error register. Reading it also clears the sensor error flag.
pub const CLEAR_ERROR_FLAG: u16 = 0x0001;

/// OTP programming control.
pub const PROGRAMMING_CONTROL: u16 = 0x0003;

/// OTP zero position, high 8 bits.
pub const OTP_ZERO_POS_HI: u16 = 0x0016;

/// OTP zero position, low 6 bits.
pub const OTP_ZERO_POS_LO: u16 = 0x0017;

/// Diagnostics and automatic gain control.
pub const DIAG_AGC: u16 = 0x3FFD;

/// CORDIC magnitude.
pub const MAGNITUDE: u16 = 0x3FFE;

/// Angle after the zero position adder.
pub const ANGLE: u16 = 0x3FFF;

// ---------------------------------------------------------------------------
// Frame layout
// ---------------------------------------------------------------------------

/// Mask for the 14-bit address / data field.
pub const DATA_MASK: u16 = 0x3FFF;

/// Bit 14 of a command: 1 = read.
pub const READ_FLAG: u16 = 1 << 14;

/// Bit 14 of a response: sensor error flag.
pub const ERROR_FLAG: u16 = 1 << 14;

/// Bit 15 of every frame: even parity bit.
pub const PARITY_BIT: u16 = 1 << 15;

/// Byte clocked out while the response is read back.
pub const FILLER: u8 = 0x00;

/// Counts per mechanical revolution (2^14).
pub const COUNTS_PER_REV: u32 = 1 << 14;
