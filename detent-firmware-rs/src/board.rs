//! RP2350 implementations of the controller's hardware collaborators.

use as5048a_driver::{As5048a, EncoderError};
use defmt::*;
use embassy_rp::adc::{self, Adc};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::pwm::{self, Pwm};
use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

use detent::io::{AngleSample, AngleSensor, CurrentSense, MotorDriver};
use detent::Direction;

// ---------------------------------------------------------------------------
// Angle sensor
// ---------------------------------------------------------------------------

/// AS5048A angle reads bounded by a fixed deadline.
pub struct TimedEncoder<SPI, CS> {
    sensor: As5048a<SPI, CS>,
    timeout: Duration,
}

impl<SPI, CS> TimedEncoder<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    pub fn new(sensor: As5048a<SPI, CS>, timeout: Duration) -> Self {
        Self { sensor, timeout }
    }

    /// Log the magnet diagnostics once. Start-up aid only; the loop never
    /// depends on it.
    pub async fn report_diagnostics(&mut self) {
        match self.sensor.read_diagnostics().await {
            Ok(Some(diag)) if diag.field_ok() => info!("AS5048A field OK, AGC = {}", diag.agc()),
            Ok(Some(diag)) => warn!("AS5048A magnet out of range: {}", diag),
            Ok(None) => warn!("AS5048A diagnostics parity failure"),
            Err(_) => error!("AS5048A diagnostics read failed"),
        }
    }
}

impl<SPI, CS> AngleSensor for TimedEncoder<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    type Error = EncoderError<SPI::Error, CS::Error>;

    async fn read_angle(&mut self) -> Result<AngleSample, Self::Error> {
        let reading = self.sensor.read_angle_within(self.timeout).await?;
        Ok(AngleSample {
            raw: reading.value(),
            parity_valid: reading.parity_valid(),
        })
    }
}

// ---------------------------------------------------------------------------
// Current sense
// ---------------------------------------------------------------------------

/// Motor current shunt amplifier on one ADC input.
pub struct AdcCurrent {
    adc: Adc<'static, adc::Blocking>,
    channel: adc::Channel<'static>,
    last: u16,
}

impl AdcCurrent {
    pub fn new(adc: Adc<'static, adc::Blocking>, channel: adc::Channel<'static>) -> Self {
        Self {
            adc,
            channel,
            last: 0,
        }
    }
}

impl CurrentSense for AdcCurrent {
    /// A failed conversion repeats the previous value.
    fn read_raw(&mut self) -> u16 {
        match self.adc.blocking_read(&mut self.channel) {
            Ok(value) => self.last = value,
            Err(_) => warn!("ADC conversion failed, holding {}", self.last),
        }
        self.last
    }
}

// ---------------------------------------------------------------------------
// Motor driver
// ---------------------------------------------------------------------------

/// PWM magnitude on channel A of one slice plus a direction pin, as taken
/// by a sign-magnitude H-bridge.
pub struct PwmMotor {
    pwm: Pwm<'static>,
    config: pwm::Config,
    direction: Output<'static>,
}

impl PwmMotor {
    /// Full-scale period; a magnitude maps 1:1 onto the compare value.
    pub const TOP: u16 = 0xFFFF;

    pub fn new(pwm: Pwm<'static>, mut config: pwm::Config, direction: Output<'static>) -> Self {
        config.top = Self::TOP;
        config.compare_a = 0;
        let mut motor = Self {
            pwm,
            config,
            direction,
        };
        motor.pwm.set_config(&motor.config);
        motor
    }
}

impl MotorDriver for PwmMotor {
    fn set_velocity(&mut self, magnitude: u16, direction: Direction) {
        self.direction.set_level(match direction {
            Direction::Forward => Level::Low,
            Direction::Reverse => Level::High,
        });
        self.config.compare_a = magnitude;
        self.pwm.set_config(&self.config);
    }
}
