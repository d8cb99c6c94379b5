pub mod aht20;

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

pub use aht20::{Aht20, Aht20Device, DeviceState, RawFrame, SENSOR_ADDRESS, SensorStatus};

/// A single temperature/humidity sample.
///
/// Produced only by a successful decode, so `valid` is `true` for every
/// reading that leaves the driver. It is kept as a field so consumers can
/// assert the invariant instead of trusting the call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f32,
    pub relative_humidity: f32,
    pub valid: bool,
}

impl SensorReading {
    pub const fn new(temperature: f32, relative_humidity: f32) -> Self {
        Self {
            temperature,
            relative_humidity,
            valid: true,
        }
    }
}

/// Bus-level failure, reduced to the `embedded-hal` error kind so the
/// driver errors stay independent of the HAL's concrete error type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("I2C transaction failed: {0}")]
pub struct TransportError(pub ErrorKind);

impl TransportError {
    pub fn from_bus<E: embedded_hal::i2c::Error>(error: E) -> Self {
        Self(error.kind())
    }
}

/// Fatal errors raised while bringing the sensor up.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("sensor did not report calibrated after {attempts} initialize attempts")]
    CalibrationFailed { attempts: u8 },
    #[error("{0}")]
    Bus(#[from] TransportError),
}

/// Recoverable errors of a single measurement attempt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureError {
    #[error("sensor still busy after {polls} status polls")]
    Busy { polls: u8 },
    #[error("frame status still reports busy")]
    FrameNotReady,
    #[error("checksum mismatch: computed {expected:#04x}, received {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("{0}")]
    Bus(#[from] TransportError),
}

/// Trait for sensors that produce temperature/humidity readings.
pub trait Sensor {
    /// Take one measurement, returning once the sensor has answered or the
    /// retry budget is spent.
    fn measure(&mut self) -> impl Future<Output = Result<SensorReading, MeasureError>>;
}
