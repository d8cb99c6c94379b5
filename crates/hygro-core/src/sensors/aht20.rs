//! AHT20 humidity/temperature sensor driver
//!
//! The protocol follows the AHT20 datasheet v1.1:
//!
//! ```text
//!   power on ─► wait 40 ms ─► CheckStatus (0x71) ◄── wait 10 ms
//!                                  │                    ▲
//!                             calibrated? ── no ─► Initialize (0xBE 0x08 0x00)
//!                                  │
//!                                 yes
//!                                  ▼
//!   TriggerMeasurement (0xAC 0x33 0x00) ─► wait 80 ms
//!                                  │
//!                                  ▼
//!              CheckStatus (0x71) ◄── busy? ── yes (bounded)
//!                                  │
//!                                  no
//!                                  ▼
//!         read 7 bytes: status, 20 bit RH, 20 bit T, CRC-8
//! ```
//!
//! Initialization is a typestate: [`Aht20::initialize`] consumes the
//! uncalibrated driver and hands back an [`Aht20Device`] that can measure.

use crc_any::CRCu8;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, info};

use super::{InitError, MeasureError, Sensor, SensorReading, TransportError};
pub use crate::config::Aht20Timing;

/// AHT20 sensor's I2C address.
pub const SENSOR_ADDRESS: u8 = 0x38;

/// Status byte, 5 data bytes, CRC byte.
pub const FRAME_LEN: usize = 7;

const SOFT_RESET_DELAY_MS: u32 = 20;

/// 2^20, the full scale of both 20-bit fields.
const RAW_FULL_SCALE: f32 = 1_048_576.0;
const RAW_MAX: u32 = (1 << 20) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    CheckStatus,
    Initialize,
    TriggerMeasurement,
    SoftReset,
}

impl Command {
    /// Command byte followed by its fixed parameters (datasheet table 9).
    const fn bytes(self) -> &'static [u8] {
        match self {
            Self::CheckStatus => &[0x71],
            Self::Initialize => &[0xBE, 0x08, 0x00],
            Self::TriggerMeasurement => &[0xAC, 0x33, 0x00],
            Self::SoftReset => &[0xBA],
        }
    }
}

/// Status byte reported by the sensor on every status read and as the first
/// byte of each measurement frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStatus(pub u8);

impl SensorStatus {
    const BUSY: u8 = 0b1000_0000;
    const CALIBRATED: u8 = 0b0000_1000;

    pub const fn is_busy(self) -> bool {
        self.0 & Self::BUSY != 0
    }

    pub const fn is_calibrated(self) -> bool {
        self.0 & Self::CALIBRATED != 0
    }
}

/// Protocol state of the sensor as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Calibrating,
    Idle,
    Measuring,
}

/// CRC-8 used by the AHT20: polynomial 0x31, initial value 0xFF, no
/// reflection, no final xor.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = CRCu8::create_crc(0x31, 8, 0xff, 0x00, false);
    crc.digest(bytes);
    crc.get_crc()
}

/// A complete measurement frame as read from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame(pub [u8; FRAME_LEN]);

impl RawFrame {
    pub const fn status(&self) -> SensorStatus {
        SensorStatus(self.0[0])
    }

    /// Checksum computed over the status and payload bytes.
    pub fn checksum(&self) -> u8 {
        crc8(&self.0[..FRAME_LEN - 1])
    }

    pub fn verify(&self) -> Result<(), MeasureError> {
        let expected = self.checksum();
        let actual = self.0[FRAME_LEN - 1];
        if expected != actual {
            return Err(MeasureError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    /// Upper 20 bits of the payload: bytes 1, 2 and the high nibble of 3.
    pub const fn raw_humidity(&self) -> u32 {
        ((self.0[1] as u32) << 12) | ((self.0[2] as u32) << 4) | ((self.0[3] as u32) >> 4)
    }

    /// Lower 20 bits of the payload: the low nibble of 3, bytes 4 and 5.
    pub const fn raw_temperature(&self) -> u32 {
        (((self.0[3] & 0x0F) as u32) << 16) | ((self.0[4] as u32) << 8) | (self.0[5] as u32)
    }

    /// Convert the payload to physical units. Does not check the CRC.
    pub fn decode(&self) -> SensorReading {
        let relative_humidity = self.raw_humidity() as f32 / RAW_FULL_SCALE * 100.0;
        let temperature = self.raw_temperature() as f32 / RAW_FULL_SCALE * 200.0 - 50.0;
        SensorReading::new(temperature, relative_humidity)
    }

    /// Build a frame carrying the given values, with a valid checksum.
    ///
    /// Values outside the sensor's range saturate at the field limits.
    pub fn encode(status: SensorStatus, relative_humidity: f32, temperature: f32) -> Self {
        let raw_humidity = to_raw(relative_humidity / 100.0);
        let raw_temperature = to_raw((temperature + 50.0) / 200.0);

        let mut bytes = [
            status.0,
            (raw_humidity >> 12) as u8,
            (raw_humidity >> 4) as u8,
            (((raw_humidity & 0x0F) << 4) | ((raw_temperature >> 16) & 0x0F)) as u8,
            (raw_temperature >> 8) as u8,
            raw_temperature as u8,
            0,
        ];
        bytes[FRAME_LEN - 1] = crc8(&bytes[..FRAME_LEN - 1]);
        Self(bytes)
    }
}

/// Scale a 0..1 fraction to a 20-bit field, rounding to nearest.
fn to_raw(fraction: f32) -> u32 {
    // `as` saturates negative values to 0
    ((fraction * RAW_FULL_SCALE + 0.5) as u32).min(RAW_MAX)
}

/// Bus, delay and timing shared by both typestates.
struct Link<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    timing: Aht20Timing,
}

impl<I: I2c, D: DelayNs> Link<I, D> {
    async fn send(&mut self, command: Command) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, command.bytes())
            .await
            .map_err(TransportError::from_bus)
    }

    async fn read_status(&mut self) -> Result<SensorStatus, TransportError> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, Command::CheckStatus.bytes(), &mut buffer)
            .await
            .map_err(TransportError::from_bus)?;
        Ok(SensorStatus(buffer[0]))
    }

    async fn read_frame(&mut self) -> Result<RawFrame, TransportError> {
        let mut buffer = [0u8; FRAME_LEN];
        self.i2c
            .read(self.address, &mut buffer)
            .await
            .map_err(TransportError::from_bus)?;
        Ok(RawFrame(buffer))
    }

    /// Send initialize until the calibrated bit is set, at most
    /// `calibration_retries` times.
    async fn calibrate(&mut self) -> Result<SensorStatus, InitError> {
        let mut status = self.read_status().await?;
        let mut attempts = 0;

        while !status.is_calibrated() {
            if attempts == self.timing.calibration_retries {
                return Err(InitError::CalibrationFailed { attempts });
            }
            attempts += 1;
            debug!(
                "AHT20: status {:#04x} not calibrated, initialize attempt {}",
                status.0, attempts
            );

            self.send(Command::Initialize).await?;
            self.delay.delay_ms(self.timing.calibration_delay_ms).await;
            status = self.read_status().await?;
        }

        Ok(status)
    }
}

/// An AHT20 that has not completed the calibration handshake yet.
pub struct Aht20<I, D> {
    link: Link<I, D>,
    state: DeviceState,
}

impl<I: I2c, D: DelayNs> Aht20<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            link: Link {
                i2c,
                delay,
                address: SENSOR_ADDRESS,
                timing: Aht20Timing::default(),
            },
            state: DeviceState::Uninitialized,
        }
    }

    /// Override the bus address, for boards with address translation.
    pub fn with_address(mut self, address: u8) -> Self {
        self.link.address = address;
        self
    }

    pub fn with_timing(mut self, timing: Aht20Timing) -> Self {
        self.link.timing = timing;
        self
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Power-up delay followed by the calibration handshake.
    pub async fn initialize(mut self) -> Result<Aht20Device<I, D>, InitError> {
        self.link
            .delay
            .delay_ms(self.link.timing.power_up_delay_ms)
            .await;

        self.state = DeviceState::Calibrating;
        let status = self.link.calibrate().await?;
        info!("AHT20: calibrated (status {:#04x})", status.0);

        Ok(Aht20Device {
            link: self.link,
            state: DeviceState::Idle,
            last_status: status,
        })
    }
}

/// A calibrated AHT20, ready to measure.
pub struct Aht20Device<I, D> {
    link: Link<I, D>,
    state: DeviceState,
    last_status: SensorStatus,
}

impl<I: I2c, D: DelayNs> Aht20Device<I, D> {
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Status byte from the most recent status read or frame.
    pub fn last_status(&self) -> SensorStatus {
        self.last_status
    }

    pub fn timing(&self) -> &Aht20Timing {
        &self.link.timing
    }

    /// Trigger a conversion and read it back.
    ///
    /// Worst case duration is [`Aht20Timing::worst_case_measure_ms`] plus
    /// bus time. The device is `Idle` again when this returns, whatever the
    /// outcome.
    pub async fn measure(&mut self) -> Result<SensorReading, MeasureError> {
        self.state = DeviceState::Measuring;
        let result = self.run_measurement().await;
        self.state = DeviceState::Idle;
        result
    }

    async fn run_measurement(&mut self) -> Result<SensorReading, MeasureError> {
        self.link.send(Command::TriggerMeasurement).await?;
        self.link
            .delay
            .delay_ms(self.link.timing.conversion_delay_ms)
            .await;

        self.wait_until_ready().await?;

        let frame = self.link.read_frame().await?;
        self.last_status = frame.status();
        frame.verify()?;

        // The status inside the CRC-checked frame wins over an earlier
        // status read that may have been corrupted on the bus.
        if frame.status().is_busy() {
            return Err(MeasureError::FrameNotReady);
        }

        Ok(frame.decode())
    }

    async fn wait_until_ready(&mut self) -> Result<(), MeasureError> {
        let retries = self.link.timing.busy_poll_retries;

        for poll in 1..=retries {
            let status = self.link.read_status().await?;
            self.last_status = status;
            if !status.is_busy() {
                return Ok(());
            }

            debug!("AHT20: busy on poll {}/{}", poll, retries);
            if poll < retries {
                self.link.delay.delay_ms(self.link.timing.busy_poll_delay_ms).await;
            }
        }

        Err(MeasureError::Busy { polls: retries })
    }

    /// Soft reset the sensor and repeat the calibration handshake.
    pub async fn soft_reset(&mut self) -> Result<(), InitError> {
        self.link.send(Command::SoftReset).await?;
        self.link.delay.delay_ms(SOFT_RESET_DELAY_MS).await;

        self.state = DeviceState::Calibrating;
        let result = self.link.calibrate().await;
        self.state = DeviceState::Idle;

        self.last_status = result?;
        Ok(())
    }

    /// Give back the bus and the delay.
    pub fn release(self) -> (I, D) {
        (self.link.i2c, self.link.delay)
    }
}

impl<I: I2c, D: DelayNs> Sensor for Aht20Device<I, D> {
    async fn measure(&mut self) -> Result<SensorReading, MeasureError> {
        Aht20Device::measure(self).await
    }
}
