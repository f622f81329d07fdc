//! The control loop state machine.
//!
//! ```text
//! Init ──► Calibrate ──► LinkUp ──► Run
//!            │  ▲          │  ▲      │ ▲
//!            └──┘          └──┘      └─┘
//!       retry until a   until the   forever
//!       parity-valid    host link
//!       sample          is ready
//! ```
//!
//! [`Controller::poll`] advances the machine by one iteration. In `Run`
//! every iteration services the host link, then runs the sampling step if
//! its cadence elapsed, then the control step if its (slower) cadence
//! elapsed. Faults never stop the loop: a bad sample holds the last good
//! position, a bad request raises the link's error flag.

use core::fmt;

use crate::control::{self, Direction, LawConfig, MotorCommand, SensedState};
use crate::estimator::{CurrentConfig, CurrentSensor, VelocityEstimator};
use crate::io::{AngleSensor, CurrentSense, HostLink, MotorDriver};
use crate::parameters::{ParameterError, ParameterStore};
use crate::protocol::{self, ProtocolError, RequestMap, Telemetry};
use crate::timing::{Cadence, Tick};
use crate::unwrap::{AngleUnwrapper, UnwrapConfig};

/// Loop configuration. Everything here is fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Rate of the tick count passed to [`Controller::poll`].
    pub clock_hz: u64,
    /// Sampling cadence (angle, velocity, current).
    pub sample_rate_hz: u32,
    /// Control law cadence.
    pub control_rate_hz: u32,
    /// Upper bound for one angle read, enforced by the sensor adapter.
    pub bus_timeout_us: u32,
    pub unwrap: UnwrapConfig,
    pub current: CurrentConfig,
    pub laws: LawConfig,
    pub requests: RequestMap,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            clock_hz: 1_000_000,
            sample_rate_hz: 1_000,
            control_rate_hz: 100,
            bus_timeout_us: 500,
            unwrap: UnwrapConfig::default(),
            current: CurrentConfig::default(),
            laws: LawConfig::default(),
            requests: RequestMap::default(),
        }
    }
}

/// Top-level loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Init,
    Calibrate,
    LinkUp,
    Run,
}

/// A recoverable problem seen by the loop. Recorded, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Angle response failed its parity check.
    ParityMismatch,
    /// Angle read failed or timed out.
    SensorUnavailable,
    /// Host sent a code outside the request map.
    UnknownRequest(u8),
    /// Host wrote a parameter slot that does not exist.
    Parameter(ParameterError),
}

impl From<ProtocolError> for Fault {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::UnknownRequest(code) => Fault::UnknownRequest(code),
            ProtocolError::Parameter(e) => Fault::Parameter(e),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::ParityMismatch => write!(f, "angle parity mismatch"),
            Fault::SensorUnavailable => write!(f, "angle sensor unavailable"),
            Fault::UnknownRequest(code) => write!(f, "unknown host request {}", code),
            Fault::Parameter(e) => write!(f, "{}", e),
        }
    }
}

/// Running totals per fault class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultCounters {
    pub parity_mismatch: u32,
    pub sensor_unavailable: u32,
    pub unknown_request: u32,
    pub parameter: u32,
    /// Sampling periods dropped because the loop was late.
    pub missed_samples: u32,
}

/// Everything the loop computes and the host can observe or tune.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub unwrapper: AngleUnwrapper,
    pub current: CurrentSensor,
    pub velocity: VelocityEstimator,
    pub params: ParameterStore,
    /// Last command sent to the motor driver.
    pub command: MotorCommand,
    pub faults: FaultCounters,
    pub last_fault: Option<Fault>,
}

impl ControllerState {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            unwrapper: AngleUnwrapper::new(config.unwrap),
            current: CurrentSensor::new(config.current),
            velocity: VelocityEstimator::new(config.sample_rate_hz),
            params: ParameterStore::new(),
            command: MotorCommand::STOP,
            faults: FaultCounters::default(),
            last_fault: None,
        }
    }

    /// Copy every host-visible value.
    pub fn snapshot(&self) -> Telemetry {
        Telemetry {
            current: self.current.current(),
            angle: self.unwrapper.unwrapped(),
            velocity: self.velocity.velocity(),
            speed: self.command.magnitude,
            direction: self.command.direction,
            offset: self.unwrapper.offset(),
            corrected: self.unwrapper.corrected(),
        }
    }

    /// Inputs to the control laws.
    pub fn sensed(&self) -> SensedState {
        SensedState {
            angle: self.unwrapper.unwrapped(),
            velocity: self.velocity.velocity(),
            current: self.current.current(),
        }
    }

    pub fn record(&mut self, fault: Fault) {
        let counter = match fault {
            Fault::ParityMismatch => &mut self.faults.parity_mismatch,
            Fault::SensorUnavailable => &mut self.faults.sensor_unavailable,
            Fault::UnknownRequest(_) => &mut self.faults.unknown_request,
            Fault::Parameter(_) => &mut self.faults.parameter,
        };
        *counter = counter.saturating_add(1);
        self.last_fault = Some(fault);
    }
}

/// Owns the collaborators and drives the loop.
pub struct Controller<S, A, M, H> {
    sensor: S,
    adc: A,
    motor: M,
    link: H,
    config: ControllerConfig,
    state: ControllerState,
    phase: Phase,
    sample: Cadence,
    control: Cadence,
}

impl<S, A, M, H> Controller<S, A, M, H>
where
    S: AngleSensor,
    A: CurrentSense,
    M: MotorDriver,
    H: HostLink,
{
    pub fn new(sensor: S, adc: A, motor: M, link: H, config: ControllerConfig) -> Self {
        Self {
            sensor,
            adc,
            motor,
            link,
            state: ControllerState::new(&config),
            phase: Phase::Init,
            sample: Cadence::from_rate(config.clock_hz, config.sample_rate_hz),
            control: Cadence::from_rate(config.clock_hz, config.control_rate_hz),
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn link(&self) -> &H {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut H {
        &mut self.link
    }

    /// Retune the sampling cadence. The velocity scale follows.
    pub fn set_sample_rate(&mut self, rate_hz: u32, now: u64) {
        self.config.sample_rate_hz = rate_hz;
        self.sample.set_rate(rate_hz, now);
        self.state.velocity.set_sample_rate(rate_hz);
    }

    /// Retune the control cadence.
    pub fn set_control_rate(&mut self, rate_hz: u32, now: u64) {
        self.config.control_rate_hz = rate_hz;
        self.control.set_rate(rate_hz, now);
    }

    /// Advance the loop by one iteration. `now` is the current tick count at
    /// [`ControllerConfig::clock_hz`].
    pub async fn poll(&mut self, now: u64) {
        match self.phase {
            Phase::Init => {
                self.motor.set_velocity(0, Direction::Forward);
                self.state.command = MotorCommand::STOP;
                #[cfg(feature = "defmt")]
                defmt::info!("controller init, motor stopped");
                self.phase = Phase::Calibrate;
            }
            Phase::Calibrate => {
                if self.calibrate().await {
                    self.sample.start(now);
                    self.phase = Phase::LinkUp;
                }
            }
            Phase::LinkUp => {
                self.service_host();
                if let Some(tick) = self.sample.poll(now) {
                    self.sample_step(tick).await;
                }
                if self.link.is_ready() {
                    #[cfg(feature = "defmt")]
                    defmt::info!("host link up, running");
                    self.control.start(now);
                    self.phase = Phase::Run;
                }
            }
            Phase::Run => {
                self.service_host();
                if let Some(tick) = self.sample.poll(now) {
                    self.sample_step(tick).await;
                }
                if self.control.poll(now).is_some() {
                    self.control_step();
                }
            }
        }
    }

    // ── Phases ───────────────────────────────────────────────────────

    /// One calibration attempt. Returns `true` once the offset is set.
    async fn calibrate(&mut self) -> bool {
        match self.sensor.read_angle().await {
            Ok(sample) if sample.parity_valid => {
                // Only reachable once: the phase moves on right after.
                let _ = self.state.unwrapper.calibrate(sample.raw);
                true
            }
            Ok(_) => {
                self.state.record(Fault::ParityMismatch);
                false
            }
            Err(_) => {
                self.state.record(Fault::SensorUnavailable);
                false
            }
        }
    }

    /// Answer at most one pending host request.
    fn service_host(&mut self) {
        let Some(request) = self.link.poll_request() else {
            return;
        };

        let snapshot = self.state.snapshot();
        match protocol::dispatch(
            &request,
            &self.config.requests,
            &snapshot,
            &mut self.state.params,
        ) {
            Ok(response) => self.link.respond(response),
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("host request refused: {}", e);
                self.link.raise_error(request.code);
                self.state.record(Fault::from(e));
            }
        }
    }

    /// Read the sensors and update position, velocity and current.
    ///
    /// A failed or parity-invalid read leaves the unwrapper untouched, so the
    /// last position and velocity hold. The next good difference spans the
    /// dropped periods.
    async fn sample_step(&mut self, tick: Tick) {
        if tick.missed > 0 {
            let missed = &mut self.state.faults.missed_samples;
            *missed = missed.saturating_add(tick.missed);
            #[cfg(feature = "defmt")]
            defmt::debug!("dropped {} sample periods", tick.missed);
        }

        let periods = tick.missed.saturating_add(1);
        match self.sensor.read_angle().await {
            Ok(sample) if sample.parity_valid => {
                let position = self.state.unwrapper.update(sample.raw);
                self.state.velocity.update_over(position, periods);
            }
            Ok(_) => {
                self.state.velocity.skip(periods);
                self.state.record(Fault::ParityMismatch);
            }
            Err(_) => {
                self.state.velocity.skip(periods);
                self.state.record(Fault::SensorUnavailable);
            }
        }

        let raw = self.adc.read_raw();
        self.state.current.update(raw);
    }

    /// Run the selected law and drive the motor.
    fn control_step(&mut self) {
        let (changes, count) = self.state.params.take_changes();
        for change in changes[..count].iter().flatten() {
            #[cfg(feature = "defmt")]
            defmt::info!("{} = {}", change.name, change.value);
            #[cfg(not(feature = "defmt"))]
            let _ = change;
        }

        let command = control::compute(
            self.state.params.mode_raw(),
            &self.state.params,
            &self.state.sensed(),
            &self.config.laws,
        );
        self.motor.set_velocity(command.magnitude, command.direction);
        self.state.command = command;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAdc, MockLink, MockMotor, MockSensor, SensorRead};
    use crate::parameters::{ParameterError, MODE};
    use crate::protocol::{ParameterWrite, Request};
    use embassy_futures::block_on;

    type TestController = Controller<MockSensor, MockAdc, MockMotor, MockLink>;

    /// 100 Hz sampling and control on a 1 MHz clock: one period is 10 000
    /// ticks.
    fn config() -> ControllerConfig {
        ControllerConfig {
            sample_rate_hz: 100,
            control_rate_hz: 100,
            ..ControllerConfig::default()
        }
    }

    fn controller(reads: &[SensorRead]) -> TestController {
        Controller::new(
            MockSensor::new(reads),
            MockAdc::new(0x7FC0),
            MockMotor::default(),
            MockLink::ready(),
            config(),
        )
    }

    /// Init, calibrate and link up at t = 0.
    fn bring_up(c: &mut TestController) {
        for _ in 0..3 {
            block_on(c.poll(0));
        }
        assert_eq!(c.phase(), Phase::Run);
    }

    const fn good(raw: u16) -> SensorRead {
        SensorRead::Sample(raw, true)
    }

    // ── Start-up ─────────────────────────────────────────────────────

    #[test]
    fn init_stops_motor() {
        let mut c = controller(&[good(0)]);
        block_on(c.poll(0));
        assert_eq!(c.phase(), Phase::Calibrate);
        assert_eq!(c.motor().last, Some((0, Direction::Forward)));
    }

    #[test]
    fn calibration_retries_past_bad_samples() {
        static READS: [SensorRead; 4] = [
            SensorRead::Sample(0x0123, false),
            SensorRead::Fail,
            good(0x0456),
            good(0x0456),
        ];
        let mut c = controller(&READS);
        block_on(c.poll(0)); // init
        block_on(c.poll(0)); // parity failure
        assert_eq!(c.phase(), Phase::Calibrate);
        block_on(c.poll(0)); // bus failure
        assert_eq!(c.phase(), Phase::Calibrate);
        block_on(c.poll(0));
        assert_eq!(c.phase(), Phase::LinkUp);

        let state = c.state();
        assert_eq!(state.unwrapper.offset(), 0x0456);
        assert_eq!(state.unwrapper.corrected(), 0);
        assert_eq!(state.faults.parity_mismatch, 1);
        assert_eq!(state.faults.sensor_unavailable, 1);
    }

    #[test]
    fn host_is_not_serviced_before_calibration() {
        let mut c = controller(&[SensorRead::Fail]);
        c.link_mut().push(Request::new(2, 0));
        for _ in 0..5 {
            block_on(c.poll(0));
        }
        assert_eq!(c.phase(), Phase::Calibrate);
        assert!(c.link().pending.is_some());
        assert!(c.link().responses.is_empty());
    }

    #[test]
    fn waits_in_link_up_until_ready() {
        let mut c = Controller::new(
            MockSensor::new(&[good(0x0100)]),
            MockAdc::new(0x7FC0),
            MockMotor::default(),
            MockLink::default(),
            config(),
        );
        for t in 0..5 {
            block_on(c.poll(t * 10_000));
        }
        assert_eq!(c.phase(), Phase::LinkUp);
        // Sampling keeps running while waiting.
        assert!(c.sensor().reads > 1);

        c.link_mut().ready = true;
        block_on(c.poll(50_000));
        assert_eq!(c.phase(), Phase::Run);
    }

    // ── Run ──────────────────────────────────────────────────────────

    #[test]
    fn set_parameter_then_damper_tick() {
        // Offset 0x1000, then +2 counts per 10 ms period: 200 counts/s.
        static READS: [SensorRead; 3] = [good(0x1000), good(0x1000), good(0x1002)];
        let mut c = controller(&READS);
        bring_up(&mut c);

        let write = ParameterWrite { index: MODE as u8, value: 1 };
        c.link_mut().push(Request::new(6, write.to_word()));

        block_on(c.poll(10_000));
        assert_eq!(c.state().params.mode_raw(), 1);
        assert_eq!(c.link().responses.len(), 1);
        assert!(c.link().responses[0].payload.is_empty());

        block_on(c.poll(20_000));
        assert_eq!(c.state().velocity.velocity(), 200);
        assert_eq!(c.motor().last, Some((0x1190, Direction::Forward)));
        assert_eq!(c.state().command.magnitude, 0x1190);
    }

    #[test]
    fn unknown_request_sets_flag_and_loop_continues() {
        static READS: [SensorRead; 2] = [good(0), good(0x0102)];
        let mut c = controller(&READS);
        bring_up(&mut c);

        c.link_mut().push(Request::new(99, 0));
        block_on(c.poll(10_000));
        assert!(c.link().error_flag());
        assert_eq!(&c.link().errors[..], &[99]);
        assert!(c.link().responses.is_empty());
        assert_eq!(c.state().faults.unknown_request, 1);

        c.link_mut().push(Request::new(2, 0));
        block_on(c.poll(10_001));
        assert_eq!(c.link().responses.len(), 1);
        assert_eq!(&c.link().responses[0].payload[..], &[0x02, 0x01]);
        // Sticky.
        assert!(c.link().error_flag());
    }

    #[test]
    fn bad_parameter_index_is_recorded() {
        let mut c = controller(&[good(0)]);
        bring_up(&mut c);

        c.link_mut().push(Request::new(6, 0x2001));
        block_on(c.poll(1));
        assert!(c.link().error_flag());
        assert_eq!(
            c.state().last_fault,
            Some(Fault::Parameter(ParameterError::InvalidIndex))
        );
        assert_eq!(c.state().faults.parameter, 1);
    }

    #[test]
    fn parity_failure_holds_last_position() {
        static READS: [SensorRead; 4] = [
            good(0),
            good(0x0010),
            SensorRead::Sample(0x3000, false),
            good(0x0020),
        ];
        let mut c = controller(&READS);
        bring_up(&mut c);

        block_on(c.poll(10_000));
        assert_eq!(c.state().unwrapper.unwrapped(), 0x0010);
        let velocity = c.state().velocity.velocity();

        block_on(c.poll(20_000));
        assert_eq!(c.state().unwrapper.unwrapped(), 0x0010);
        assert_eq!(c.state().velocity.velocity(), velocity);
        assert_eq!(c.state().faults.parity_mismatch, 1);

        block_on(c.poll(30_000));
        assert_eq!(c.state().unwrapper.unwrapped(), 0x0020);
    }

    #[test]
    fn sensor_timeout_degrades_to_hold() {
        static READS: [SensorRead; 3] = [good(0), good(0x0040), SensorRead::Fail];
        let mut c = controller(&READS);
        bring_up(&mut c);

        block_on(c.poll(10_000));
        block_on(c.poll(20_000));
        assert_eq!(c.state().unwrapper.unwrapped(), 0x0040);
        assert_eq!(c.state().faults.sensor_unavailable, 1);
        assert_eq!(c.phase(), Phase::Run);
    }

    #[test]
    fn current_is_sampled_each_sample_tick() {
        let mut c = controller(&[good(0)]);
        bring_up(&mut c);
        block_on(c.poll(10_000));
        // 0x7FC0 >> 6 is the default zero point.
        assert_eq!(c.state().current.current(), 0);
        assert_eq!(c.state().snapshot().current, 0);
    }

    #[test]
    fn late_iteration_counts_missed_samples() {
        let mut c = controller(&[good(0)]);
        bring_up(&mut c);
        block_on(c.poll(45_000));
        assert_eq!(c.state().faults.missed_samples, 3);
    }

    #[test]
    fn late_iteration_keeps_velocity_in_counts_per_second() {
        // +2 counts per 10 ms period: 200 counts/s.
        static READS: [SensorRead; 3] = [good(0), good(2), good(10)];
        let mut c = controller(&READS);
        bring_up(&mut c);

        block_on(c.poll(10_000));
        assert_eq!(c.state().velocity.velocity(), 0);

        // Due at 20 000, three periods late.
        block_on(c.poll(50_000));
        assert_eq!(c.state().faults.missed_samples, 3);
        assert_eq!(c.state().velocity.velocity(), 200);
    }

    #[test]
    fn held_sample_is_spanned_by_next_velocity() {
        static READS: [SensorRead; 4] = [
            good(0),
            good(2),
            SensorRead::Sample(0x2000, false),
            good(6),
        ];
        let mut c = controller(&READS);
        bring_up(&mut c);

        block_on(c.poll(10_000));
        block_on(c.poll(20_000));
        assert_eq!(c.state().faults.parity_mismatch, 1);

        block_on(c.poll(30_000));
        assert_eq!(c.state().unwrapper.unwrapped(), 6);
        assert_eq!(c.state().velocity.velocity(), 200);
    }

    #[test]
    fn unknown_mode_fails_safe() {
        let mut c = controller(&[good(0), good(0x0100)]);
        bring_up(&mut c);

        c.link_mut().push(Request::new(6, 0x0407));
        block_on(c.poll(10_000));
        assert_eq!(c.motor().last, Some((0, Direction::Forward)));
    }

    #[test]
    fn retuning_sample_rate_rescales_velocity() {
        static READS: [SensorRead; 3] = [good(0), good(0), good(1)];
        let mut c = controller(&READS);
        bring_up(&mut c);

        c.set_sample_rate(1_000, 0);
        block_on(c.poll(1_000));
        block_on(c.poll(2_000));
        assert_eq!(c.state().velocity.velocity(), 1_000);
    }
}
