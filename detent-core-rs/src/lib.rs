//! Control core for a single-axis haptic detent knob.
//!
//! The crate turns raw readings from a 14-bit magnetic angle sensor and a
//! motor current ADC into motor commands under a host-selectable control
//! law, and answers telemetry and tuning requests from a host.
//!
//! # Architecture
//!
//! - [`unwrap`] resolves encoder rollover into a continuous position.
//! - [`estimator`] zero-centers current and differentiates position.
//! - [`control`] holds the control laws (spring, damper, texture, wall,
//!   torque tracking) and the shared post-processing.
//! - [`parameters`] is the host-tunable gain and mode table.
//! - [`protocol`] decodes host requests, encodes telemetry, and frames both
//!   for serial links.
//! - [`timing`] provides the periodic cadences the loop polls.
//! - [`io`] defines the hardware collaborator traits.
//! - [`controller`] ties everything into the `Init → Calibrate → LinkUp →
//!   Run` state machine.
//!
//! Everything except the collaborators is synchronous, allocation-free, and
//! testable on the host.
//!
//! # Features
//!
//! - **`defmt`** — Enable [`defmt::Format`] implementations and structured
//!   log output for embedded targets.

#![no_std]

pub mod control;
pub mod controller;
pub mod estimator;
pub mod io;
pub mod parameters;
pub mod protocol;
pub mod timing;
pub mod unwrap;

#[cfg(test)]
mod mock;

pub use control::{ControlMode, Direction, MotorCommand};
pub use controller::{Controller, ControllerConfig, ControllerState, Fault, Phase};
pub use parameters::{ParameterError, ParameterStore};
