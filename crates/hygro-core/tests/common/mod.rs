//! Test doubles shared by the integration tests: a simulated AHT20 on a fake
//! bus, a delay that only records time, and a thread-local log capture.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Once;

use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hygro_core::sensors::{RawFrame, SENSOR_ADDRESS, SensorStatus};

pub const STATUS_CALIBRATED: u8 = 0x18;
pub const STATUS_BUSY: u8 = 0x98;

/// Observable state of the simulated sensor.
#[derive(Debug, Default)]
pub struct SimState {
    /// Initialize commands needed before the calibrated bit is set.
    /// `None` never calibrates.
    pub calibrate_after: Option<u32>,
    pub initialize_commands: u32,
    /// Busy status replies after each trigger. `None` stays busy forever.
    pub busy_polls: Option<u32>,
    pub busy_remaining: Option<u32>,
    pub frames: VecDeque<RawFrame>,
    /// Error returned by the next trigger command.
    pub fail_next_trigger: Option<ErrorKind>,
    /// Error returned by every transaction.
    pub fail_all: Option<ErrorKind>,

    pub status_reads: u32,
    pub triggers: u32,
    pub frame_reads: u32,
    pub soft_resets: u32,
    /// A trigger was sent and its frame has not been read yet.
    pub measuring: bool,
    pub log: Vec<BusEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Status(u8),
    Initialize,
    Trigger,
    Frame,
    SoftReset,
}

impl SimState {
    fn calibrated(&self) -> bool {
        self.calibrate_after
            .is_some_and(|needed| self.initialize_commands >= needed)
    }

    fn next_status(&mut self) -> u8 {
        let calibrated = if self.calibrated() { 0x08 } else { 0x00 };
        let busy = self.measuring
            && match self.busy_remaining.as_mut() {
                None => true,
                Some(0) => false,
                Some(remaining) => {
                    *remaining -= 1;
                    true
                }
            };
        0x10 | calibrated | if busy { 0x80 } else { 0x00 }
    }

    fn next_frame(&mut self) -> RawFrame {
        self.frames
            .pop_front()
            .unwrap_or_else(|| RawFrame::encode(SensorStatus(STATUS_CALIBRATED), 50.0, 20.0))
    }

    fn on_write(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        match bytes {
            [0xBE, 0x08, 0x00] => {
                self.initialize_commands += 1;
                self.log.push(BusEvent::Initialize);
            }
            [0xAC, 0x33, 0x00] => {
                if let Some(kind) = self.fail_next_trigger.take() {
                    return Err(kind);
                }
                self.triggers += 1;
                self.measuring = true;
                self.busy_remaining = self.busy_polls;
                self.log.push(BusEvent::Trigger);
            }
            [0xBA] => {
                self.soft_resets += 1;
                self.initialize_commands = 0;
                self.measuring = false;
                self.log.push(BusEvent::SoftReset);
            }
            _ => return Err(ErrorKind::Other),
        }
        Ok(())
    }
}

/// Simulated AHT20 behind an `embedded-hal-async` I2C bus.
#[derive(Clone)]
pub struct FakeBus {
    pub state: Rc<RefCell<SimState>>,
}

impl FakeBus {
    /// A sensor that is calibrated at power-on and never busy.
    pub fn ready() -> Self {
        Self::new(SimState {
            calibrate_after: Some(0),
            busy_polls: Some(0),
            ..SimState::default()
        })
    }

    pub fn new(state: SimState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn push_frame(&self, frame: RawFrame) {
        self.state.borrow_mut().frames.push_back(frame);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if address != SENSOR_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        if let Some(kind) = state.fail_all {
            return Err(kind);
        }

        let mut status_requested = false;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write([0x71]) => status_requested = true,
                Operation::Write(bytes) => state.on_write(bytes)?,
                Operation::Read(buffer) if status_requested && buffer.len() == 1 => {
                    status_requested = false;
                    let status = state.next_status();
                    state.status_reads += 1;
                    state.log.push(BusEvent::Status(status));
                    buffer[0] = status;
                }
                Operation::Read(buffer) if buffer.len() == 7 => {
                    let frame = state.next_frame();
                    state.frame_reads += 1;
                    state.measuring = false;
                    state.log.push(BusEvent::Frame);
                    buffer.copy_from_slice(&frame.0);
                }
                Operation::Read(_) => return Err(ErrorKind::Other),
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and records the requested time.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    pub elapsed_ms: Rc<Cell<u64>>,
    pub calls: Rc<Cell<u32>>,
}

impl RecordingDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.get()
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls.set(self.calls.get() + 1);
        self.elapsed_ms
            .set(self.elapsed_ms.get() + u64::from(ns) / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.calls.set(self.calls.get() + 1);
        self.elapsed_ms.set(self.elapsed_ms.get() + u64::from(us) / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.set(self.calls.get() + 1);
        self.elapsed_ms.set(self.elapsed_ms.get() + u64::from(ms));
    }
}

struct CaptureLogger;

thread_local! {
    static CAPTURED: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        CAPTURED.with(|lines| {
            lines
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT_LOGGER: Once = Once::new();

/// Install the capturing logger and clear this thread's buffer.
pub fn capture_logs() {
    INIT_LOGGER.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    CAPTURED.with(|lines| lines.borrow_mut().clear());
}

/// Messages logged on this thread since [`capture_logs`].
pub fn captured_logs() -> Vec<(log::Level, String)> {
    CAPTURED.with(|lines| lines.borrow().clone())
}

pub fn valid_frame(relative_humidity: f32, temperature: f32) -> RawFrame {
    RawFrame::encode(SensorStatus(STATUS_CALIBRATED), relative_humidity, temperature)
}

pub fn corrupted_frame(relative_humidity: f32, temperature: f32) -> RawFrame {
    let mut frame = valid_frame(relative_humidity, temperature);
    frame.0[6] ^= 0xFF;
    frame
}
