//! Telemetry snapshots and response payload encoding.

use heapless::Vec;

use super::request::RequestKind;
use crate::control::Direction;

/// Longest response payload in bytes.
pub const MAX_PAYLOAD: usize = 2;

pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// Every host-visible value, copied at one instant.
///
/// Responses are encoded from a snapshot, never from live state, so a
/// multi-byte field cannot be torn by a concurrent update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub current: i32,
    /// Unwrapped position.
    pub angle: i32,
    /// Counts per second. Clips at ±32 767 on the wire.
    pub velocity: i32,
    /// Last commanded magnitude.
    pub speed: u16,
    pub direction: Direction,
    /// Calibration offset.
    pub offset: u16,
    /// Offset-corrected 14-bit angle.
    pub corrected: u16,
}

/// An answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u8,
    pub payload: Payload,
}

impl Response {
    /// Acknowledgement with no payload.
    pub fn empty(code: u8) -> Self {
        Self {
            code,
            payload: Vec::new(),
        }
    }

    /// Encode the telemetry field `kind` asks for.
    ///
    /// Signed fields are clamped to the `i16` range, then sent little
    /// endian. `SetParameter` has no payload.
    pub fn telemetry(code: u8, kind: RequestKind, snapshot: &Telemetry) -> Self {
        let (bytes, len) = match kind {
            RequestKind::GetCurrent => (saturate_i16(snapshot.current).to_le_bytes(), 2),
            RequestKind::GetAngle => (saturate_i16(snapshot.angle).to_le_bytes(), 2),
            RequestKind::GetVelocity => (saturate_i16(snapshot.velocity).to_le_bytes(), 2),
            RequestKind::GetSpeed => (snapshot.speed.to_le_bytes(), 2),
            RequestKind::GetDirection => ([snapshot.direction.as_u8(), 0], 1),
            RequestKind::GetOffset => (snapshot.offset.to_le_bytes(), 2),
            RequestKind::GetRawAngle => (snapshot.corrected.to_le_bytes(), 2),
            RequestKind::SetParameter => ([0, 0], 0),
        };
        let mut payload = Payload::new();
        // len <= MAX_PAYLOAD
        let _ = payload.extend_from_slice(&bytes[..len]);
        Self { code, payload }
    }
}

/// Clamp to the range a 2-byte signed field can carry.
pub fn saturate_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
