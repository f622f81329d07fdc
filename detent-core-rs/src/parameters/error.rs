use core::fmt;

/// Errors that can occur when working with the parameter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParameterError {
    /// Parameter index is out of bounds (must be < N_PARAMS).
    InvalidIndex,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParameterError::InvalidIndex => write!(f, "parameter index out of range"),
        }
    }
}
