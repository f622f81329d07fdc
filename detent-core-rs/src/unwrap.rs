//! Rollover tracking for the 14-bit absolute angle.
//!
//! The encoder reports `0..=0x3FFF` per mechanical revolution. The
//! [`AngleUnwrapper`] subtracts a calibration offset, counts boundary
//! crossings, and produces a continuous signed position.
//!
//! A crossing is only counted when two consecutive corrected readings sit on
//! opposite sides of the boundary, each inside its threshold window. Ordinary
//! motion between the windows can never register as a wrap.

use core::fmt;

/// Mask for a 14-bit raw angle.
pub const ANGLE_MASK: u16 = 0x3FFF;

/// Counts per revolution of the sensor (2^14).
pub const COUNTS_PER_REV: i32 = 0x4000;

/// Revolution span used by older host tooling, which scales wraps by the
/// mask value rather than the count.
pub const LEGACY_REVOLUTION_SPAN: i32 = 0x3FFF;

/// Wrap detection and scaling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnwrapConfig {
    /// A reading below this is "just past zero".
    pub low_threshold: u16,
    /// A reading above this is "just before the top".
    pub high_threshold: u16,
    /// Added to the position once per counted wrap.
    pub revolution_span: i32,
}

impl UnwrapConfig {
    /// Thresholds at the same distance from both ends of the range.
    ///
    /// ```
    /// use detent::unwrap::UnwrapConfig;
    ///
    /// let config = UnwrapConfig::symmetric(0x00E4);
    /// assert_eq!(config.high_threshold, 0x3F1B);
    ///
    /// let wide = UnwrapConfig::symmetric(0x038E);
    /// assert_eq!(wide.high_threshold, 0x3C71);
    /// ```
    pub const fn symmetric(window: u16) -> Self {
        let window = if window > ANGLE_MASK / 2 {
            ANGLE_MASK / 2
        } else {
            window
        };
        Self {
            low_threshold: window,
            high_threshold: ANGLE_MASK - window,
            revolution_span: COUNTS_PER_REV,
        }
    }

    /// Same thresholds, different span.
    pub const fn with_revolution_span(self, revolution_span: i32) -> Self {
        Self {
            revolution_span,
            ..self
        }
    }
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self::symmetric(0x00E4)
    }
}

/// Returned when the offset is captured a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    AlreadyCalibrated,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CalibrationError::AlreadyCalibrated => write!(f, "angle offset already captured"),
        }
    }
}

/// Continuous position from a wrapping 14-bit angle.
///
/// Feed every parity-valid sample to [`update`](Self::update) exactly once
/// and skip parity failures, which leaves the last good position and wrap
/// count in place. Applying the same physical sample twice can double-count
/// a wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleUnwrapper {
    config: UnwrapConfig,
    offset: u16,
    calibrated: bool,
    /// `None` until the first reading after construction with a known offset.
    last_corrected: Option<u16>,
    wraps: i32,
    unwrapped: i32,
}

impl AngleUnwrapper {
    /// An unwrapper waiting for [`calibrate`](Self::calibrate).
    pub fn new(config: UnwrapConfig) -> Self {
        Self {
            config,
            offset: 0,
            calibrated: false,
            last_corrected: None,
            wraps: 0,
            unwrapped: 0,
        }
    }

    /// An unwrapper with an offset known ahead of time (e.g. programmed into
    /// the sensor). The first [`update`](Self::update) only establishes the
    /// reference reading and never counts a wrap.
    pub fn with_offset(config: UnwrapConfig, offset: u16) -> Self {
        Self {
            offset: offset & ANGLE_MASK,
            calibrated: true,
            ..Self::new(config)
        }
    }

    /// Capture `raw` as the zero position.
    ///
    /// Only the first call takes effect. Right after it the corrected angle
    /// and the unwrapped position are both 0.
    pub fn calibrate(&mut self, raw: u16) -> Result<(), CalibrationError> {
        if self.calibrated {
            return Err(CalibrationError::AlreadyCalibrated);
        }
        self.offset = raw & ANGLE_MASK;
        self.calibrated = true;
        self.last_corrected = Some(0);
        self.wraps = 0;
        self.unwrapped = 0;

        #[cfg(feature = "defmt")]
        defmt::info!("angle offset captured: {=u16:#x}", self.offset);
        Ok(())
    }

    /// Apply one new raw sample and return the unwrapped position.
    ///
    /// Before calibration the offset is 0.
    pub fn update(&mut self, raw: u16) -> i32 {
        let corrected = (raw & ANGLE_MASK).wrapping_sub(self.offset) & ANGLE_MASK;

        if let Some(last) = self.last_corrected {
            let low = self.config.low_threshold;
            let high = self.config.high_threshold;
            if corrected < low && last > high {
                self.wraps = self.wraps.saturating_add(1);
            } else if corrected > high && last < low {
                self.wraps = self.wraps.saturating_sub(1);
            }
        }

        self.last_corrected = Some(corrected);
        self.unwrapped = (corrected as i32)
            .saturating_add(self.config.revolution_span.saturating_mul(self.wraps));
        self.unwrapped
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// The captured zero position.
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// The last corrected 14-bit angle, 0 before any sample.
    pub fn corrected(&self) -> u16 {
        self.last_corrected.unwrap_or(0)
    }

    /// Net boundary crossings, positive for forward rotation.
    pub fn wraps(&self) -> i32 {
        self.wraps
    }

    pub fn unwrapped(&self) -> i32 {
        self.unwrapped
    }

    pub fn config(&self) -> &UnwrapConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated_at(raw: u16) -> AngleUnwrapper {
        let mut unwrapper = AngleUnwrapper::new(UnwrapConfig::default());
        unwrapper.calibrate(raw).unwrap();
        unwrapper
    }

    // ── Calibration ──────────────────────────────────────────────────

    #[test]
    fn corrected_is_zero_right_after_calibration() {
        let mut unwrapper = calibrated_at(0x1234);
        assert_eq!(unwrapper.corrected(), 0);
        assert_eq!(unwrapper.update(0x1234), 0);
        assert_eq!(unwrapper.corrected(), 0);
        assert_eq!(unwrapper.wraps(), 0);
    }

    #[test]
    fn second_calibration_is_rejected() {
        let mut unwrapper = calibrated_at(0x0100);
        assert_eq!(
            unwrapper.calibrate(0x0200),
            Err(CalibrationError::AlreadyCalibrated)
        );
        assert_eq!(unwrapper.offset(), 0x0100);
    }

    #[test]
    fn offset_subtraction_wraps_modulo_14_bits() {
        let mut unwrapper = calibrated_at(0x3000);
        unwrapper.update(0x3800);
        assert_eq!(unwrapper.corrected(), 0x0800);

        // Below the offset comes out near the top of the range.
        unwrapper.update(0x2FF0);
        assert_eq!(unwrapper.corrected(), 0x3FF0);
    }

    // ── Wrap detection ───────────────────────────────────────────────

    #[test]
    fn forward_crossing_increments_wraps() {
        let mut unwrapper = AngleUnwrapper::with_offset(UnwrapConfig::default(), 0);
        unwrapper.update(0x3FF0);
        assert_eq!(unwrapper.wraps(), 0);

        let position = unwrapper.update(0x0010);
        assert_eq!(unwrapper.wraps(), 1);
        assert_eq!(position, 0x0010 + COUNTS_PER_REV);
    }

    #[test]
    fn legacy_span_matches_host_tooling_scale() {
        let config = UnwrapConfig::symmetric(0x00E4).with_revolution_span(LEGACY_REVOLUTION_SPAN);
        let mut unwrapper = AngleUnwrapper::with_offset(config, 0);

        assert_eq!(unwrapper.update(0x3FF0), 0x3FF0);
        assert_eq!(unwrapper.update(0x0010), 0x400F);
        assert_eq!(unwrapper.wraps(), 1);
    }

    #[test]
    fn backward_crossing_decrements_wraps() {
        let mut unwrapper = calibrated_at(0);
        unwrapper.update(0x0020);
        let position = unwrapper.update(0x3FE0);
        assert_eq!(unwrapper.wraps(), -1);
        assert_eq!(position, 0x3FE0 - COUNTS_PER_REV);
    }

    #[test]
    fn motion_between_windows_never_wraps() {
        let mut unwrapper = calibrated_at(0);
        // Large jumps that do not start and end inside opposite windows.
        for raw in [0x0100, 0x3F00, 0x0100, 0x2000, 0x00E4, 0x3F1B, 0x0000] {
            unwrapper.update(raw);
            assert_eq!(unwrapper.wraps(), 0, "raw {:#06x}", raw);
        }
    }

    #[test]
    fn thresholds_are_exclusive() {
        let mut unwrapper = AngleUnwrapper::with_offset(UnwrapConfig::default(), 0);
        unwrapper.update(0x3F1B); // not > high
        unwrapper.update(0x0000);
        assert_eq!(unwrapper.wraps(), 0);

        unwrapper.update(0x2000);
        unwrapper.update(0x3F1C);
        unwrapper.update(0x00E4); // not < low
        assert_eq!(unwrapper.wraps(), 0);
    }

    #[test]
    fn wider_window_catches_faster_crossings() {
        let config = UnwrapConfig::symmetric(0x038E);
        let mut unwrapper = AngleUnwrapper::with_offset(config, 0);
        unwrapper.update(0x3D00);
        unwrapper.update(0x0200);
        assert_eq!(unwrapper.wraps(), 1);
    }

    #[test]
    fn several_revolutions_accumulate() {
        let mut unwrapper = calibrated_at(0);
        for _ in 0..3 {
            for raw in [0x1000, 0x2000, 0x3000, 0x3FF0, 0x0008] {
                unwrapper.update(raw);
            }
        }
        assert_eq!(unwrapper.wraps(), 3);
        assert_eq!(unwrapper.unwrapped(), 0x0008 + 3 * COUNTS_PER_REV);
    }

    #[test]
    fn unwrapped_is_continuous_away_from_wraps() {
        let mut unwrapper = calibrated_at(0);
        let mut last = unwrapper.unwrapped();
        let mut raw: u16 = 0;
        for _ in 0..200 {
            raw = (raw + 0x00A0) & ANGLE_MASK;
            let wraps_before = unwrapper.wraps();
            let position = unwrapper.update(raw);
            if unwrapper.wraps() == wraps_before {
                assert!((position - last).abs() < COUNTS_PER_REV / 2);
            }
            assert!(position > last);
            last = position;
        }
    }

    // ── Overflow policy ──────────────────────────────────────────────

    #[test]
    fn wrap_count_saturates() {
        let mut unwrapper = AngleUnwrapper::with_offset(UnwrapConfig::default(), 0);
        unwrapper.wraps = i32::MAX;
        unwrapper.update(0x3FF0);
        let position = unwrapper.update(0x0010);
        assert_eq!(unwrapper.wraps(), i32::MAX);
        assert_eq!(position, i32::MAX);
    }

    #[test]
    fn symmetric_window_is_capped_at_half_range() {
        let config = UnwrapConfig::symmetric(0xFFFF);
        assert!(config.low_threshold <= config.high_threshold);
    }
}
