//! Periodic event sources polled from the control loop.
//!
//! A [`Cadence`] replaces a countdown timer with a sticky "elapsed" flag:
//! the loop asks it whether a period has passed and the answer clears
//! itself. Time is a monotonic tick count supplied by the caller, so the
//! same code runs against `embassy_time::Instant` on the target and against
//! plain numbers in tests.
//!
//! A late poll fires once. Periods that elapsed in the meantime are
//! reported in [`Tick::missed`] and dropped; they are never replayed.

/// One elapsed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Whole periods skipped since the previous tick.
    pub missed: u32,
}

/// Fixed-rate event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    clock_hz: u64,
    period: u64,
    next: u64,
    running: bool,
}

impl Cadence {
    /// A stopped cadence firing every `period` ticks. A zero period is
    /// raised to one tick.
    pub const fn new(period: u64) -> Self {
        Self {
            clock_hz: 0,
            period: if period == 0 { 1 } else { period },
            next: 0,
            running: false,
        }
    }

    /// A stopped cadence firing `rate_hz` times per second of a clock
    /// running at `clock_hz`.
    ///
    /// ```
    /// use detent::timing::Cadence;
    ///
    /// let sample = Cadence::from_rate(1_000_000, 1_000);
    /// assert_eq!(sample.period(), 1_000);
    /// ```
    pub const fn from_rate(clock_hz: u64, rate_hz: u32) -> Self {
        let mut cadence = Self::new(period_for(clock_hz, rate_hz));
        cadence.clock_hz = clock_hz;
        cadence
    }

    /// Begin counting. The first tick is one period after `now`.
    pub fn start(&mut self, now: u64) {
        self.next = now.saturating_add(self.period);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Change the rate. Takes effect from `now`; a running cadence is
    /// restarted. Only meaningful for cadences built with
    /// [`from_rate`](Self::from_rate).
    pub fn set_rate(&mut self, rate_hz: u32, now: u64) {
        self.set_period(period_for(self.clock_hz, rate_hz), now);
    }

    /// Change the period in ticks. A running cadence is restarted at `now`.
    pub fn set_period(&mut self, period: u64, now: u64) {
        self.period = period.max(1);
        if self.running {
            self.start(now);
        }
    }

    /// `Some` once per elapsed period.
    pub fn poll(&mut self, now: u64) -> Option<Tick> {
        if !self.running || now < self.next {
            return None;
        }
        let missed = (now - self.next) / self.period;
        self.next = self
            .next
            .saturating_add((missed + 1).saturating_mul(self.period));
        Some(Tick {
            missed: u32::try_from(missed).unwrap_or(u32::MAX),
        })
    }
}

const fn period_for(clock_hz: u64, rate_hz: u32) -> u64 {
    if rate_hz == 0 {
        return u64::MAX;
    }
    let period = clock_hz / rate_hz as u64;
    if period == 0 {
        1
    } else {
        period
    }
}
