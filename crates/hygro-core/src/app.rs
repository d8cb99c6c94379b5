//! Application bring-up shared by the firmware and the simulator
//!
//! The order is fixed: validate the configuration, calibrate the sensor,
//! build the dashboard (titles and `--` placeholders), then hand back a
//! measurement loop that has not ticked yet. Any failure aborts startup and
//! no loop is returned.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};
use thiserror_no_std::Error;

use crate::config::{ConfigError, MonitorConfig};
use crate::sampling::MeasurementLoop;
use crate::sensors::{Aht20, Aht20Device, InitError};
use crate::ui::{Dashboard, DisplayError, LabelSurface};

/// How far startup got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    SensorReady,
    DisplayReady,
    Sampling,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("sensor initialization failed: {0}")]
    Sensor(#[from] InitError),
    #[error("display setup failed: {0}")]
    Display(#[from] DisplayError),
}

impl StartupError {
    /// Last state reached before the failure.
    pub fn reached(&self) -> AppRunState {
        match self {
            Self::Config(_) | Self::Sensor(_) => AppRunState::Uninitialized,
            Self::Display(_) => AppRunState::SensorReady,
        }
    }
}

pub type Monitor<I, D, S, P> = MeasurementLoop<Aht20Device<I, D>, Dashboard<S>, P>;

/// Bring the sensor and the dashboard up and return the ready loop.
///
/// `pacing` is the delay the loop waits between ticks; the sensor keeps the
/// delay it was created with for protocol timing.
pub async fn bring_up<I, D, S, P>(
    config: &MonitorConfig,
    sensor: Aht20<I, D>,
    surface: S,
    pacing: P,
) -> Result<Monitor<I, D, S, P>, StartupError>
where
    I: I2c,
    D: DelayNs,
    S: LabelSurface,
    P: DelayNs,
{
    match try_bring_up(config, sensor, surface, pacing).await {
        Ok(monitor) => {
            info!(
                "Startup complete ({:?}), sampling every {} ms",
                AppRunState::Sampling,
                config.sampling.interval_ms
            );
            Ok(monitor)
        }
        Err(e) => {
            error!("Startup failed after {:?}: {}", e.reached(), e);
            Err(e)
        }
    }
}

async fn try_bring_up<I, D, S, P>(
    config: &MonitorConfig,
    sensor: Aht20<I, D>,
    surface: S,
    pacing: P,
) -> Result<Monitor<I, D, S, P>, StartupError>
where
    I: I2c,
    D: DelayNs,
    S: LabelSurface,
    P: DelayNs,
{
    config.validate()?;

    let device = sensor.with_timing(config.sensor).initialize().await?;
    debug!("Startup state: {:?}", AppRunState::SensorReady);

    let dashboard = Dashboard::build(surface)?;
    debug!("Startup state: {:?}", AppRunState::DisplayReady);

    Ok(MeasurementLoop::new(device, dashboard, pacing, config.sampling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::TransportError;
    use embedded_hal::i2c::ErrorKind;

    #[test]
    fn test_reached_state() {
        assert_eq!(
            StartupError::from(ConfigError::ZeroInterval).reached(),
            AppRunState::Uninitialized
        );
        assert_eq!(
            StartupError::from(InitError::Bus(TransportError(ErrorKind::Other))).reached(),
            AppRunState::Uninitialized
        );
        assert_eq!(
            StartupError::from(DisplayError::UnknownLabel).reached(),
            AppRunState::SensorReady
        );
    }
}
