//! Runtime configuration for the sampling loop and the AHT20 protocol timing
//!
//! All durations are milliseconds. Every struct is `serde`-derivable so the
//! simulator can load it from TOML, and every field has a default so partial
//! files are accepted.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub sampling: SamplingConfig,
    pub sensor: Aht20Timing,
}

/// Cadence of the measurement loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Delay before each measurement attempt.
    pub interval_ms: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_ms: 250 }
    }
}

/// Timing and retry budgets of the AHT20 handshake and measurement.
///
/// Defaults follow the AHT20 datasheet v1.1: 40 ms after power-on, 10 ms
/// after an initialize command and 80 ms for a conversion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Aht20Timing {
    pub power_up_delay_ms: u32,
    /// Maximum number of initialize commands sent before giving up.
    pub calibration_retries: u8,
    pub calibration_delay_ms: u32,
    pub conversion_delay_ms: u32,
    /// Maximum number of status polls while the busy flag is set.
    pub busy_poll_retries: u8,
    pub busy_poll_delay_ms: u32,
}

impl Default for Aht20Timing {
    fn default() -> Self {
        Self {
            power_up_delay_ms: 40,
            calibration_retries: 5,
            calibration_delay_ms: 10,
            conversion_delay_ms: 80,
            busy_poll_retries: 10,
            busy_poll_delay_ms: 10,
        }
    }
}

impl Aht20Timing {
    /// Worst-case duration of a single `measure` call.
    ///
    /// Saturates at `u32::MAX`, which no interval can accommodate.
    pub const fn worst_case_measure_ms(&self) -> u32 {
        let polls = self.busy_poll_retries as u32;
        let polling = polls.saturating_sub(1).saturating_mul(self.busy_poll_delay_ms);
        self.conversion_delay_ms.saturating_add(polling)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampling interval must be non-zero")]
    ZeroInterval,
    #[error("busy poll budget must allow at least one poll")]
    ZeroPollBudget,
    #[error("calibration budget must allow at least one attempt")]
    ZeroCalibrationBudget,
    #[error("worst-case measurement of {worst_case_ms} ms does not fit in a {interval_ms} ms interval")]
    MeasureExceedsInterval { worst_case_ms: u32, interval_ms: u32 },
}

impl MonitorConfig {
    /// Reject configurations where ticks could pile up or the driver could
    /// never succeed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.sensor.busy_poll_retries == 0 {
            return Err(ConfigError::ZeroPollBudget);
        }
        if self.sensor.calibration_retries == 0 {
            return Err(ConfigError::ZeroCalibrationBudget);
        }

        let worst_case_ms = self.sensor.worst_case_measure_ms();
        if worst_case_ms >= self.sampling.interval_ms {
            return Err(ConfigError::MeasureExceedsInterval {
                worst_case_ms,
                interval_ms: self.sampling.interval_ms,
            });
        }

        Ok(())
    }
}
