//! Async driver for the AS5048A 14-bit magnetic rotary position sensor.
//!
//! This crate provides an Embassy-compatible async SPI driver for the ams
//! AS5048A (SPI variant). It handles the command/response framing, parity,
//! and the register map.
//!
//! # Architecture
//!
//! The crate is split into two layers:
//!
//! - **`driver`** (crate-private): two-phase chip-select framing and
//!   big-endian word transfer.
//! - **[`As5048a`]** (public): validated register reads, angle and
//!   diagnostics helpers, and timeout-bounded reads.
//!
//! [`frame`] and [`registers`] are public so callers can build or decode
//! frames without a bus.
//!
//! # Quick start
//!
//! ```ignore
//! use as5048a_driver::As5048a;
//!
//! // Construct with any `embedded-hal-async` SPI bus and a CS output pin
//! let mut sensor = As5048a::new(spi, cs);
//!
//! let reading = sensor.read_angle().await?;
//! ```
//!
//! # Features
//!
//! - **`defmt`** — Enable [`defmt::Format`] implementations on error and
//!   reading types for embedded logging.

#![no_std]

pub use error::EncoderError;
pub use frame::{Diagnostics, Reading};
pub use registers::COUNTS_PER_REV;
pub use sensor::As5048a;

mod driver;
mod error;
pub mod frame;
pub mod registers;
mod sensor;

#[cfg(test)]
mod mock;
