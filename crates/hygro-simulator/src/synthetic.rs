//! Synthetic AHT20 on a fake I2C bus, plus a sleeping delay.
//!
//! The sensor starts uncalibrated, answers one busy status after every
//! trigger and corrupts the checksum of every `corrupt_every`-th frame, so
//! the calibration handshake, busy polling and the drop path all run.

use std::time::{Duration, Instant};

use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hygro_core::sensors::{RawFrame, SENSOR_ADDRESS, SensorStatus};

const STATUS_IDLE: u8 = 0x10;
const STATUS_CALIBRATED: u8 = 0x08;
const STATUS_BUSY: u8 = 0x80;

/// Generates slowly varying readings.
pub struct Climate {
    started: Instant,
}

impl Climate {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// (relative humidity, temperature) at `t` seconds.
    pub fn at(t: f64) -> (f32, f32) {
        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        // Humidity: 40–60 % with different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();
        (humidity as f32, temperature as f32)
    }

    pub fn now(&self) -> (f32, f32) {
        Self::at(self.started.elapsed().as_secs_f64())
    }
}

impl Default for Climate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SyntheticAht20 {
    climate: Climate,
    calibrated: bool,
    busy_polls_left: u8,
    frames: u32,
    corrupt_every: u32,
}

impl SyntheticAht20 {
    pub fn new(corrupt_every: u32) -> Self {
        Self {
            climate: Climate::new(),
            calibrated: false,
            busy_polls_left: 0,
            frames: 0,
            corrupt_every,
        }
    }

    fn status(&mut self) -> u8 {
        let mut status = STATUS_IDLE;
        if self.calibrated {
            status |= STATUS_CALIBRATED;
        }
        if self.busy_polls_left > 0 {
            self.busy_polls_left -= 1;
            status |= STATUS_BUSY;
        }
        status
    }

    fn frame(&mut self) -> RawFrame {
        self.frames += 1;
        let (humidity, temperature) = self.climate.now();
        let mut frame = RawFrame::encode(
            SensorStatus(STATUS_IDLE | STATUS_CALIBRATED),
            humidity,
            temperature,
        );

        if self.corrupt_every != 0 && self.frames % self.corrupt_every == 0 {
            frame.0[6] ^= 0x5A;
        }
        frame
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        match bytes {
            [0xBE, 0x08, 0x00] => self.calibrated = true,
            [0xAC, 0x33, 0x00] => self.busy_polls_left = 1,
            [0xBA] => self.calibrated = false,
            _ => return Err(ErrorKind::Other),
        }
        Ok(())
    }
}

impl ErrorType for SyntheticAht20 {
    type Error = ErrorKind;
}

impl I2c for SyntheticAht20 {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != SENSOR_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }

        let mut status_requested = false;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write([0x71]) => status_requested = true,
                Operation::Write(bytes) => self.command(bytes)?,
                Operation::Read([status]) if status_requested => {
                    status_requested = false;
                    *status = self.status();
                }
                Operation::Read(buffer) if buffer.len() == 7 => {
                    buffer.copy_from_slice(&self.frame().0);
                }
                Operation::Read(_) => return Err(ErrorKind::Other),
            }
        }
        Ok(())
    }
}

/// Delay backed by `std::thread::sleep`, for the sampling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    async fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
