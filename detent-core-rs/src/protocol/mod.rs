//! Host request/response protocol.
//!
//! The host sends one request at a time: a code plus a 16-bit argument.
//! Telemetry requests are answered from a [`Telemetry`] snapshot;
//! `SET_PARAMETER` writes the [`ParameterStore`]. Anything else is refused
//! and the caller raises the sticky error flag on its transport.
//!
//! | Request        | Code | Payload                                  |
//! |----------------|------|------------------------------------------|
//! | GET_CURRENT    | 1    | 2 bytes LE, signed                       |
//! | GET_ANGLE      | 2    | 2 bytes LE, signed                       |
//! | GET_VELOCITY   | 3    | 2 bytes LE, signed                       |
//! | GET_SPEED      | 4    | 2 bytes LE, unsigned                     |
//! | GET_DIRECTION  | 5    | 1 byte, 0 forward / 1 reverse            |
//! | SET_PARAMETER  | 6    | none; argument is `index << 8 \| value`  |
//! | GET_OFFSET     | 7    | 2 bytes LE, unsigned                     |
//! | GET_RAW_ANGLE  | 8    | 2 bytes LE, unsigned                     |
//!
//! Signed fields saturate to the `i16` range. Position is in encoder counts,
//! so GET_ANGLE clips about two revolutions from the zero point. Velocity is
//! in counts per second, so GET_VELOCITY clips at 32 767 counts/s, just
//! under two revolutions per second whatever the sampling rate.
//!
//! [`frame`] adds byte framing for serial transports.

pub mod frame;
mod request;
mod response;

pub use frame::{encode_request, encode_response, FrameDecoder, ResponseFrame, START_BYTE, STATUS_ERROR};
pub use request::{ParameterWrite, ProtocolError, Request, RequestKind, RequestMap};
pub use response::{saturate_i16, Payload, Response, Telemetry, MAX_PAYLOAD};

use crate::parameters::ParameterStore;

/// Serve one request.
///
/// On success the returned [`Response`] should be sent back. On error
/// nothing is sent for the request and the store is untouched.
///
/// # Examples
///
/// ```
/// use detent::parameters::ParameterStore;
/// use detent::protocol::{dispatch, ProtocolError, Request, RequestMap, Telemetry};
///
/// let map = RequestMap::default();
/// let mut params = ParameterStore::new();
/// let snapshot = Telemetry { angle: 0x0102, ..Default::default() };
///
/// let response = dispatch(&Request::new(2, 0), &map, &snapshot, &mut params).unwrap();
/// assert_eq!(&response.payload[..], &[0x02, 0x01]);
///
/// let refused = dispatch(&Request::new(99, 0), &map, &snapshot, &mut params);
/// assert_eq!(refused, Err(ProtocolError::UnknownRequest(99)));
/// ```
pub fn dispatch(
    request: &Request,
    map: &RequestMap,
    snapshot: &Telemetry,
    params: &mut ParameterStore,
) -> Result<Response, ProtocolError> {
    let kind = map
        .decode(request.code)
        .ok_or(ProtocolError::UnknownRequest(request.code))?;

    if kind == RequestKind::SetParameter {
        let write = ParameterWrite::from_word(request.value);
        params.set(usize::from(write.index), u16::from(write.value))?;
    }

    Ok(Response::telemetry(request.code, kind, snapshot))
}
