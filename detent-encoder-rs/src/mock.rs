//! Test doubles for the SPI bus and chip-select pin.

extern crate std;

use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;
use std::vec::Vec;

use embassy_time::{Duration, MockDriver};

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind};
use embedded_hal_async::spi::SpiBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSpiError;

impl spi::Error for MockSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Scripted SPI bus: every in-place transfer returns the next canned frame
/// and records what was clocked out.
#[derive(Default)]
pub struct MockSpi {
    responses: Vec<[u8; 2]>,
    next: usize,
    transfers: usize,
    pub sent: Vec<u8>,
    /// Fail the transfer with this zero-based index.
    pub fail_after: Option<usize>,
    /// Never complete the transfer with this zero-based index. Each poll
    /// advances the mock clock by [`STALL_STEP`].
    pub stall_at: Option<usize>,
}

/// Mock time that passes per poll of a stalled transfer.
pub const STALL_STEP: Duration = Duration::from_micros(50);

impl MockSpi {
    pub fn with_responses(responses: &[[u8; 2]]) -> Self {
        Self {
            responses: responses.to_vec(),
            ..Self::default()
        }
    }

    /// A bus whose transfer number `index` never completes.
    pub fn stalling_at(index: usize) -> Self {
        Self {
            stall_at: Some(index),
            ..Self::default()
        }
    }

    /// Responses for a sequence of register reads, each preceded by the
    /// (ignored) frame answering the command phase.
    pub fn answering(words: &[u16]) -> Self {
        let mut responses = Vec::new();
        for word in words {
            responses.push([0x00, 0x00]);
            responses.push(word.to_be_bytes());
        }
        Self {
            responses,
            ..Self::default()
        }
    }
}

impl spi::ErrorType for MockSpi {
    type Error = MockSpiError;
}

impl SpiBus<u8> for MockSpi {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.sent.extend_from_slice(words);
        Ok(())
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.sent.extend_from_slice(write);
        read.fill(0);
        Ok(())
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_after == Some(self.transfers) {
            return Err(MockSpiError);
        }
        if self.stall_at == Some(self.transfers) {
            return poll_fn(|_| {
                MockDriver::get().advance(STALL_STEP);
                Poll::Pending
            })
            .await;
        }
        self.transfers += 1;
        self.sent.extend_from_slice(words);

        let response = self.responses.get(self.next).copied().unwrap_or([0, 0]);
        self.next += 1;
        for (word, byte) in words.iter_mut().zip(response) {
            *word = byte;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    High,
    Low,
}

/// Chip-select pin that records every level change.
#[derive(Default)]
pub struct MockCs {
    pub events: Vec<PinEvent>,
}

impl MockCs {
    pub fn is_low(&self) -> bool {
        self.events.last() == Some(&PinEvent::Low)
    }
}

impl digital::ErrorType for MockCs {
    type Error = Infallible;
}

impl OutputPin for MockCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.events.push(PinEvent::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.events.push(PinEvent::High);
        Ok(())
    }
}
