//! Hardware collaborators of the control loop.
//!
//! The [`Controller`](crate::controller::Controller) only talks to the
//! outside world through these traits. The firmware implements them on top
//! of the RP2350 peripherals; tests implement them with scripted mocks.

use core::future::Future;

use crate::control::Direction;
use crate::protocol::{Request, Response};

/// One angle register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngleSample {
    /// 14-bit angle, masked.
    pub raw: u16,
    /// `false` if the response failed its parity check. `raw` must not be
    /// used in that case.
    pub parity_valid: bool,
}

/// Absolute angle sensor.
///
/// Implementations must bound the read in time and report an expired
/// deadline as an error, never wait forever.
pub trait AngleSensor {
    type Error;

    fn read_angle(&mut self) -> impl Future<Output = Result<AngleSample, Self::Error>>;
}

/// Motor current ADC channel.
pub trait CurrentSense {
    /// One raw conversion.
    fn read_raw(&mut self) -> u16;
}

/// Motor driver output stage.
pub trait MotorDriver {
    /// Drive at `magnitude` (full scale `u16::MAX`) in `direction`. 0 stops.
    fn set_velocity(&mut self, magnitude: u16, direction: Direction);
}

/// Host transport carrying one request at a time.
pub trait HostLink {
    /// Take the pending request, if any. Must not block.
    fn poll_request(&mut self) -> Option<Request>;

    /// Send the answer to the last request.
    fn respond(&mut self, response: Response);

    /// Raise the sticky error flag for the request with `code`. The flag
    /// stays set for the lifetime of the link.
    fn raise_error(&mut self, code: u8);

    fn error_flag(&self) -> bool;

    /// `true` once the host side is attached and requests can flow.
    fn is_ready(&self) -> bool;
}
