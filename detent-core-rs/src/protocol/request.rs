//! Request codes and decoding.

use crate::parameters::ParameterError;
use core::fmt;

/// Operations the host can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    GetCurrent,
    GetAngle,
    GetVelocity,
    GetSpeed,
    GetDirection,
    SetParameter,
    GetOffset,
    GetRawAngle,
}

/// Request code assignment. Codes are configuration so a host built
/// against a different numbering can be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestMap {
    pub get_current: u8,
    pub get_angle: u8,
    pub get_velocity: u8,
    pub get_speed: u8,
    pub get_direction: u8,
    pub set_parameter: u8,
    pub get_offset: u8,
    pub get_raw_angle: u8,
}

impl Default for RequestMap {
    fn default() -> Self {
        Self {
            get_current: 1,
            get_angle: 2,
            get_velocity: 3,
            get_speed: 4,
            get_direction: 5,
            set_parameter: 6,
            get_offset: 7,
            get_raw_angle: 8,
        }
    }
}

impl RequestMap {
    /// Look up a wire code. The first matching entry wins.
    pub fn decode(&self, code: u8) -> Option<RequestKind> {
        self.entries()
            .into_iter()
            .find(|(c, _)| *c == code)
            .map(|(_, kind)| kind)
    }

    /// Wire code for `kind`.
    pub fn code(&self, kind: RequestKind) -> u8 {
        match kind {
            RequestKind::GetCurrent => self.get_current,
            RequestKind::GetAngle => self.get_angle,
            RequestKind::GetVelocity => self.get_velocity,
            RequestKind::GetSpeed => self.get_speed,
            RequestKind::GetDirection => self.get_direction,
            RequestKind::SetParameter => self.set_parameter,
            RequestKind::GetOffset => self.get_offset,
            RequestKind::GetRawAngle => self.get_raw_angle,
        }
    }

    fn entries(&self) -> [(u8, RequestKind); 8] {
        [
            (self.get_current, RequestKind::GetCurrent),
            (self.get_angle, RequestKind::GetAngle),
            (self.get_velocity, RequestKind::GetVelocity),
            (self.get_speed, RequestKind::GetSpeed),
            (self.get_direction, RequestKind::GetDirection),
            (self.set_parameter, RequestKind::SetParameter),
            (self.get_offset, RequestKind::GetOffset),
            (self.get_raw_angle, RequestKind::GetRawAngle),
        ]
    }
}

/// One request as received: a code and a 16-bit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    pub code: u8,
    pub value: u16,
}

impl Request {
    pub const fn new(code: u8, value: u16) -> Self {
        Self { code, value }
    }
}

/// Argument of a `SET_PARAMETER` request: `index << 8 | value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterWrite {
    pub index: u8,
    pub value: u8,
}

impl ParameterWrite {
    /// ```
    /// use detent::protocol::ParameterWrite;
    ///
    /// let write = ParameterWrite::from_word(0x0401);
    /// assert_eq!((write.index, write.value), (4, 1));
    /// assert_eq!(write.to_word(), 0x0401);
    /// ```
    pub const fn from_word(word: u16) -> Self {
        let [index, value] = word.to_be_bytes();
        Self { index, value }
    }

    pub const fn to_word(self) -> u16 {
        u16::from_be_bytes([self.index, self.value])
    }
}

/// Why a request was not answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Code not in the [`RequestMap`].
    UnknownRequest(u8),
    /// `SET_PARAMETER` named a slot that does not exist.
    Parameter(ParameterError),
}

impl From<ParameterError> for ProtocolError {
    fn from(e: ParameterError) -> Self {
        ProtocolError::Parameter(e)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::UnknownRequest(code) => write!(f, "unknown request code {}", code),
            ProtocolError::Parameter(e) => write!(f, "parameter write failed: {}", e),
        }
    }
}
