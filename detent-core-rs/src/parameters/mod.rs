//! Host-tunable parameter table.
//!
//! This module provides the [`ParameterStore`] that holds the gains and the
//! mode selector read by the control laws on every control tick. The host
//! overwrites entries by index through the `SET_PARAMETER` request.
//!
//! # Layout
//!
//! ```text
//! Index  Name          Default  Used by
//! 0      K_spring      2        SPRING gain
//! 1      K_damper      2        DAMPER gain
//! 2      K_texture     2        TEXTURE gain
//! 3      K_wall        2        WALL gain
//! 4      Mode          0        law selector (0 = SPRING)
//! 5      k_theta_tau   1        TORQUE_TRACK angle -> torque
//! 6      k_tau_v       1        TORQUE_TRACK torque error -> velocity
//! 7      k_i_tau       1        TORQUE_TRACK current -> torque
//! ```
//!
//! # Change Tracking
//!
//! Every write sets a per-slot `changed` flag. The control loop drains the
//! flags with [`ParameterStore::take_changes()`] to log what the host tuned.
//!
//! # `no_std` Compatibility
//!
//! No heap allocation; storage is a fixed array of [`N_PARAMS`] slots.

mod error;
mod parameter;
mod store;

pub use error::ParameterError;
pub use parameter::Parameter;
pub use store::{ParameterChange, ParameterStore};

/// Number of parameter slots.
pub const N_PARAMS: usize = 8;

// Slot indices
pub const K_SPRING: usize = 0;
pub const K_DAMPER: usize = 1;
pub const K_TEXTURE: usize = 2;
pub const K_WALL: usize = 3;
pub const MODE: usize = 4;
pub const K_THETA_TAU: usize = 5;
pub const K_TAU_V: usize = 6;
pub const K_I_TAU: usize = 7;

/// Human-readable parameter names for logging, indexed by slot.
pub const PARAM_NAMES: [&str; N_PARAMS] = [
    "K_spring",
    "K_damper",
    "K_texture",
    "K_wall",
    "Mode",
    "k_theta_tau",
    "k_tau_v",
    "k_i_tau",
];

/// Power-on values, indexed by slot.
pub const PARAM_DEFAULTS: [u16; N_PARAMS] = [2, 2, 2, 2, 0, 1, 1, 1];
