//! Byte framing for carrying requests and responses over a serial link.
//!
//! ```text
//! request:  [START, code, value_lo, value_hi, checksum]
//! response: [START, code, status, len, payload[len].., checksum]
//! ```
//!
//! The checksum is the wrapping sum of every byte after `START`. Frames
//! with a bad checksum are dropped without a reply.

use heapless::Vec;

use super::request::Request;
use super::response::{Response, MAX_PAYLOAD};

/// Sync byte opening every frame.
pub const START_BYTE: u8 = 0xA5;

/// Length of a request frame.
pub const REQUEST_FRAME_LEN: usize = 5;

/// Longest response frame.
pub const MAX_RESPONSE_FRAME_LEN: usize = 5 + MAX_PAYLOAD;

/// `status` bit: the sticky error flag is raised.
pub const STATUS_ERROR: u8 = 0x01;

pub type ResponseFrame = Vec<u8, MAX_RESPONSE_FRAME_LEN>;

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Frame a request (host side, and tests).
pub fn encode_request(request: &Request) -> [u8; REQUEST_FRAME_LEN] {
    let [lo, hi] = request.value.to_le_bytes();
    let body = [request.code, lo, hi];
    [START_BYTE, body[0], body[1], body[2], checksum(&body)]
}

/// Frame a response with the given status bits.
pub fn encode_response(response: &Response, status: u8) -> ResponseFrame {
    let mut frame = ResponseFrame::new();
    // Capacity covers the header, MAX_PAYLOAD bytes and the checksum.
    let _ = frame.push(START_BYTE);
    let _ = frame.push(response.code);
    let _ = frame.push(status);
    let _ = frame.push(response.payload.len() as u8);
    let _ = frame.extend_from_slice(&response.payload);
    let sum = checksum(&frame[1..]);
    let _ = frame.push(sum);
    frame
}

enum State {
    WaitStart,
    Body { len: usize },
    WaitChecksum,
}

/// Incremental request parser. Feed received bytes one at a time.
pub struct FrameDecoder {
    state: State,
    body: [u8; 3],
    checksum: u8,
    dropped: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            state: State::WaitStart,
            body: [0; 3],
            checksum: 0,
            dropped: 0,
        }
    }

    /// Process a single incoming byte. Returns `Some(Request)` when a
    /// complete frame with a valid checksum has been received.
    ///
    /// ```
    /// use detent::protocol::{encode_request, FrameDecoder, Request};
    ///
    /// let mut decoder = FrameDecoder::new();
    /// let frame = encode_request(&Request::new(2, 0));
    ///
    /// let mut got = None;
    /// for byte in frame {
    ///     got = decoder.push(byte).or(got);
    /// }
    /// assert_eq!(got, Some(Request::new(2, 0)));
    /// ```
    pub fn push(&mut self, byte: u8) -> Option<Request> {
        match self.state {
            State::WaitStart => {
                if byte == START_BYTE {
                    self.state = State::Body { len: 0 };
                    self.checksum = 0;
                }
            }
            State::Body { len } => {
                self.body[len] = byte;
                self.checksum = self.checksum.wrapping_add(byte);
                self.state = if len + 1 == self.body.len() {
                    State::WaitChecksum
                } else {
                    State::Body { len: len + 1 }
                };
            }
            State::WaitChecksum => {
                self.state = State::WaitStart;
                if byte == self.checksum {
                    let [code, lo, hi] = self.body;
                    return Some(Request::new(code, u16::from_le_bytes([lo, hi])));
                }
                self.dropped = self.dropped.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::debug!("dropped request frame, bad checksum");
            }
        }
        None
    }

    /// Frames discarded for a bad checksum since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
