//! Scripted collaborators for driving the controller in tests.

use heapless::Vec;

use crate::control::Direction;
use crate::io::{AngleSample, AngleSensor, CurrentSense, HostLink, MotorDriver};
use crate::protocol::{Request, Response};

/// One scripted angle read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRead {
    /// Raw value and parity flag.
    Sample(u16, bool),
    /// Bus error or timeout.
    Fail,
}

/// Replays a script of reads, repeating the last entry once exhausted.
pub struct MockSensor {
    script: Vec<SensorRead, 16>,
    pub reads: usize,
}

impl MockSensor {
    pub fn new(script: &[SensorRead]) -> Self {
        let mut copy = Vec::new();
        for read in script.iter().take(16) {
            let _ = copy.push(*read);
        }
        Self {
            script: copy,
            reads: 0,
        }
    }
}

impl AngleSensor for MockSensor {
    type Error = ();

    async fn read_angle(&mut self) -> Result<AngleSample, ()> {
        let index = self.reads.min(self.script.len().saturating_sub(1));
        self.reads += 1;
        match self.script.get(index) {
            Some(SensorRead::Sample(raw, parity_valid)) => Ok(AngleSample {
                raw: *raw,
                parity_valid: *parity_valid,
            }),
            Some(SensorRead::Fail) | None => Err(()),
        }
    }
}

/// Always converts to the same value.
pub struct MockAdc {
    pub value: u16,
}

impl MockAdc {
    pub fn new(value: u16) -> Self {
        Self { value }
    }
}

impl CurrentSense for MockAdc {
    fn read_raw(&mut self) -> u16 {
        self.value
    }
}

/// Remembers the last command.
#[derive(Default)]
pub struct MockMotor {
    pub last: Option<(u16, Direction)>,
    pub calls: usize,
}

impl MotorDriver for MockMotor {
    fn set_velocity(&mut self, magnitude: u16, direction: Direction) {
        self.last = Some((magnitude, direction));
        self.calls += 1;
    }
}

/// Single-slot request mailbox recording responses and errors.
#[derive(Default)]
pub struct MockLink {
    pub pending: Option<Request>,
    pub responses: Vec<Response, 8>,
    pub errors: Vec<u8, 8>,
    pub ready: bool,
    flag: bool,
}

impl MockLink {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, request: Request) {
        self.pending = Some(request);
    }
}

impl HostLink for MockLink {
    fn poll_request(&mut self) -> Option<Request> {
        self.pending.take()
    }

    fn respond(&mut self, response: Response) {
        let _ = self.responses.push(response);
    }

    fn raise_error(&mut self, code: u8) {
        self.flag = true;
        let _ = self.errors.push(code);
    }

    fn error_flag(&self) -> bool {
        self.flag
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
