//! Motor current and shaft velocity estimates.

/// ADC-to-current conversion settings.
///
/// The zero offset is a per-board calibration constant: it differs between
/// hardware revisions and ADC front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentConfig {
    /// Reading (after the shift) that corresponds to zero current.
    pub zero_offset: i32,
    /// Right shift applied to left-aligned ADC results.
    pub adc_shift: u8,
}

impl Default for CurrentConfig {
    /// 10-bit left-aligned conversions in a 16-bit register, centered on
    /// half scale.
    fn default() -> Self {
        Self {
            zero_offset: 0x01FF,
            adc_shift: 6,
        }
    }
}

/// Zero-centered motor current from raw ADC samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSensor {
    config: CurrentConfig,
    current: i32,
}

impl CurrentSensor {
    pub fn new(config: CurrentConfig) -> Self {
        Self { config, current: 0 }
    }

    /// Convert one ADC sample and remember it.
    ///
    /// ```
    /// use detent::estimator::{CurrentConfig, CurrentSensor};
    ///
    /// let mut sensor = CurrentSensor::new(CurrentConfig::default());
    /// // 0x7FC0 >> 6 == 0x01FF, the zero point.
    /// assert_eq!(sensor.update(0x7FC0), 0);
    /// assert_eq!(sensor.update(0x8000), 1);
    /// ```
    pub fn update(&mut self, adc_raw: u16) -> i32 {
        let shift = u32::from(self.config.adc_shift.min(15));
        self.current = i32::from(adc_raw >> shift) - self.config.zero_offset;
        self.current
    }

    /// The last converted value.
    pub fn current(&self) -> i32 {
        self.current
    }
}

/// Finite-difference velocity of the unwrapped position.
///
/// Output is in encoder counts per second: the position change divided by
/// the sample periods it spans, times the sampling rate. The product is
/// formed in 64 bits and saturated to `i32`, so a large jump never
/// overflows. Periods without a usable sample are reported through
/// [`skip`](Self::skip) and folded into the next difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelocityEstimator {
    sample_rate_hz: u32,
    last: Option<i32>,
    gap: u32,
    velocity: i32,
}

impl VelocityEstimator {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            last: None,
            gap: 0,
            velocity: 0,
        }
    }

    /// Feed the position taken one period after the previous one. The first
    /// call yields 0.
    pub fn update(&mut self, unwrapped: i32) -> i32 {
        self.update_over(unwrapped, 1)
    }

    /// Feed a position taken `periods` sample periods after the previous
    /// one, plus any periods recorded with [`skip`](Self::skip).
    ///
    /// ```
    /// use detent::estimator::VelocityEstimator;
    ///
    /// let mut estimator = VelocityEstimator::new(100);
    /// estimator.update(2);
    /// // Three periods dropped by a late loop, then a fresh sample.
    /// assert_eq!(estimator.update_over(10, 4), 200);
    /// ```
    pub fn update_over(&mut self, unwrapped: i32, periods: u32) -> i32 {
        let span = self.gap.saturating_add(periods.max(1));
        self.velocity = match self.last {
            Some(last) => {
                let delta = i64::from(unwrapped) - i64::from(last);
                let scaled = delta * i64::from(self.sample_rate_hz) / i64::from(span);
                scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
            }
            None => 0,
        };
        self.last = Some(unwrapped);
        self.gap = 0;
        self.velocity
    }

    /// Record `periods` sample periods with no usable position. The
    /// velocity is held until the next update.
    pub fn skip(&mut self, periods: u32) {
        if self.last.is_some() {
            self.gap = self.gap.saturating_add(periods);
        }
    }

    /// The last computed velocity.
    pub fn velocity(&self) -> i32 {
        self.velocity
    }

    /// Change the scale after the sampling cadence was retuned. The next
    /// difference uses the new rate.
    pub fn set_sample_rate(&mut self, sample_rate_hz: u32) {
        self.sample_rate_hz = sample_rate_hz;
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}
