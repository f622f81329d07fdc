//! Control laws: sensed state plus gains in, motor command out.
//!
//! Every law produces a signed delta. A shared post-processing step turns it
//! into a direction and a magnitude scaled by the active mode's gain and
//! lifted by the motor driver's dead zone:
//!
//! ```text
//! direction = delta >= 0 ? Forward : Reverse
//! magnitude = |delta| * gain[mode] + dead_zone
//! ```
//!
//! [`compute`] is pure. The same mode, parameters, state and configuration
//! always give the same command.

use crate::parameters::{
    ParameterStore, K_DAMPER, K_I_TAU, K_SPRING, K_TAU_V, K_TEXTURE, K_THETA_TAU, K_WALL,
};
use crate::unwrap::COUNTS_PER_REV;

/// Selectable control law. The discriminant is the value of the `Mode`
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ControlMode {
    Spring = 0,
    Damper = 1,
    Texture = 2,
    Wall = 3,
    TorqueTrack = 4,
}

impl ControlMode {
    /// Decode the raw mode parameter. Unknown values give `None`.
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(ControlMode::Spring),
            1 => Some(ControlMode::Damper),
            2 => Some(ControlMode::Texture),
            3 => Some(ControlMode::Wall),
            4 => Some(ControlMode::TorqueTrack),
            _ => None,
        }
    }

    /// Parameter slot holding this mode's output gain.
    pub const fn gain_index(self) -> usize {
        match self {
            ControlMode::Spring => K_SPRING,
            ControlMode::Damper => K_DAMPER,
            ControlMode::Texture => K_TEXTURE,
            ControlMode::Wall => K_WALL,
            ControlMode::TorqueTrack => K_TAU_V,
        }
    }
}

/// Rotation sense handed to the motor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Wire value: 0 forward, 1 reverse.
    pub const fn as_u8(self) -> u8 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }

    /// Direction for a signed delta; zero counts as forward.
    pub const fn of(delta: i64) -> Self {
        if delta >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

/// Output of one control tick. A magnitude of 0 stops the motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCommand {
    pub magnitude: u16,
    pub direction: Direction,
}

impl MotorCommand {
    pub const STOP: Self = Self {
        magnitude: 0,
        direction: Direction::Forward,
    };
}

/// Detent positions for the TEXTURE law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TextureTable {
    /// Unwrapped bump positions, or positions within one period when
    /// `period` is set.
    pub bumps: &'static [i32],
    /// Half-width of the window around each bump.
    pub tolerance: u16,
    /// Delta emitted inside a window.
    pub bump_speed: u16,
    /// When non-zero, positions are compared modulo this span so the
    /// pattern repeats. 0 compares the unwrapped position as is.
    pub period: i32,
}

/// Eight evenly spaced bumps over the first revolution.
pub const DEFAULT_BUMPS: [i32; 8] = [
    0x0400, 0x0C00, 0x1400, 0x1C00, 0x2400, 0x2C00, 0x3400, 0x3C00,
];

impl Default for TextureTable {
    fn default() -> Self {
        Self {
            bumps: &DEFAULT_BUMPS,
            tolerance: 0x0080,
            bump_speed: 0x0800,
            period: 0,
        }
    }
}

impl TextureTable {
    /// The default bumps, repeated every revolution.
    pub fn per_revolution() -> Self {
        Self {
            period: COUNTS_PER_REV,
            ..Self::default()
        }
    }

    /// `true` if `angle` lies within `tolerance` of any bump.
    pub fn on_bump(&self, angle: i32) -> bool {
        let position = if self.period > 0 {
            i64::from(angle).rem_euclid(i64::from(self.period))
        } else {
            i64::from(angle)
        };
        let tolerance = i64::from(self.tolerance);
        self.bumps
            .iter()
            .any(|&bump| (position - i64::from(bump)).abs() <= tolerance)
    }
}

/// Virtual end stop for the WALL law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallConfig {
    /// Unwrapped position beyond which the wall pushes back.
    pub location: i32,
    /// Delta emitted past the wall.
    pub speed: u16,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            location: 0x1FFF,
            speed: 0x7800,
        }
    }
}

/// Build-time settings shared by all laws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LawConfig {
    /// Added to every magnitude; the smallest duty cycle that moves the
    /// motor.
    pub dead_zone: u16,
    pub texture: TextureTable,
    pub wall: WallConfig,
}

impl Default for LawConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0x1000,
            texture: TextureTable::default(),
            wall: WallConfig::default(),
        }
    }
}

/// Sensed inputs to a control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensedState {
    /// Unwrapped position in counts.
    pub angle: i32,
    /// Counts per second.
    pub velocity: i32,
    /// Zero-centered current.
    pub current: i32,
}

/// Signed delta of `mode`'s law before gain and dead zone.
pub fn raw_delta(
    mode: ControlMode,
    params: &ParameterStore,
    sensed: &SensedState,
    config: &LawConfig,
) -> i64 {
    match mode {
        ControlMode::Spring => i64::from(sensed.angle),
        ControlMode::Damper => i64::from(sensed.velocity),
        ControlMode::Texture => {
            if config.texture.on_bump(sensed.angle) {
                i64::from(config.texture.bump_speed)
            } else {
                0
            }
        }
        ControlMode::Wall => {
            if sensed.angle > config.wall.location {
                i64::from(config.wall.speed)
            } else {
                0
            }
        }
        ControlMode::TorqueTrack => {
            let k_theta_tau = i64::from(gain(params, K_THETA_TAU));
            let k_i_tau = i64::from(gain(params, K_I_TAU));
            let desired = i64::from(sensed.angle) * k_theta_tau;
            let measured = i64::from(sensed.current) * k_i_tau;
            desired - measured
        }
    }
}

/// Compute the motor command for the raw mode selector.
///
/// An unrecognized mode returns [`MotorCommand::STOP`].
///
/// # Examples
///
/// ```
/// use detent::control::{compute, Direction, LawConfig, SensedState};
/// use detent::parameters::{ParameterStore, MODE};
///
/// let mut params = ParameterStore::new();
/// params.set(MODE, 1).unwrap(); // DAMPER, gain 2
///
/// let sensed = SensedState { velocity: 200, ..Default::default() };
/// let command = compute(params.mode_raw(), &params, &sensed, &LawConfig::default());
///
/// assert_eq!(command.direction, Direction::Forward);
/// assert_eq!(command.magnitude, 0x1190);
/// ```
pub fn compute(
    mode_raw: u16,
    params: &ParameterStore,
    sensed: &SensedState,
    config: &LawConfig,
) -> MotorCommand {
    let Some(mode) = ControlMode::from_raw(mode_raw) else {
        return MotorCommand::STOP;
    };

    let delta = raw_delta(mode, params, sensed, config);
    let gain = u64::from(gain(params, mode.gain_index()));
    let scaled = delta
        .unsigned_abs()
        .saturating_mul(gain)
        .saturating_add(u64::from(config.dead_zone));

    MotorCommand {
        magnitude: u16::try_from(scaled).unwrap_or(u16::MAX),
        direction: Direction::of(delta),
    }
}

fn gain(params: &ParameterStore, index: usize) -> u16 {
    // Indices come from the constants in `parameters` and are in range.
    params.get(index).unwrap_or(0)
}
