//! Build-time overrides of the monitor configuration
//!
//! `build.rs` forwards `HYGRO_*` variables from `.env` or the environment as
//! compile-time values. They are parsed here, on the device, so a malformed
//! value is reported at boot instead of silently ignored.

use core::str::FromStr;

use hygro_core::config::MonitorConfig;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{key}={value} is not a valid number")]
pub struct EnvOverrideError {
    pub key: &'static str,
    pub value: &'static str,
}

fn parse<T: FromStr>(
    key: &'static str,
    value: Option<&'static str>,
) -> Result<Option<T>, EnvOverrideError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| EnvOverrideError { key, value })
        })
        .transpose()
}

/// Defaults from `hygro-core`, with any baked-in overrides applied.
pub fn monitor_config() -> Result<MonitorConfig, EnvOverrideError> {
    let mut config = MonitorConfig::default();

    if let Some(interval_ms) = parse(
        "HYGRO_SAMPLE_INTERVAL_MS",
        option_env!("HYGRO_SAMPLE_INTERVAL_MS"),
    )? {
        config.sampling.interval_ms = interval_ms;
    }
    if let Some(retries) = parse(
        "HYGRO_BUSY_POLL_RETRIES",
        option_env!("HYGRO_BUSY_POLL_RETRIES"),
    )? {
        config.sensor.busy_poll_retries = retries;
    }
    if let Some(delay_ms) = parse(
        "HYGRO_BUSY_POLL_DELAY_MS",
        option_env!("HYGRO_BUSY_POLL_DELAY_MS"),
    )? {
        config.sensor.busy_poll_delay_ms = delay_ms;
    }
    if let Some(retries) = parse(
        "HYGRO_CALIBRATION_RETRIES",
        option_env!("HYGRO_CALIBRATION_RETRIES"),
    )? {
        config.sensor.calibration_retries = retries;
    }

    Ok(config)
}
