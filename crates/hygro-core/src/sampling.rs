//! Periodic measurement loop
//!
//! Waits a fixed interval, takes one measurement and forwards accepted
//! readings to a [`Presenter`]. A failed measurement is dropped and the loop
//! simply waits for the next tick: no retry, no backoff. Since there is a
//! single loop awaiting each measurement to completion, two measurements are
//! never in flight at once.

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use crate::config::SamplingConfig;
use crate::sensors::{MeasureError, Sensor, SensorReading};

/// Consumer of accepted readings.
pub trait Presenter {
    fn present(&mut self, reading: &SensorReading);
}

impl<P: Presenter> Presenter for &mut P {
    fn present(&mut self, reading: &SensorReading) {
        (**self).present(reading);
    }
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Accepted(SensorReading),
    Dropped(MeasureError),
    /// The sensor answered but flagged its reading invalid.
    Rejected(SensorReading),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    pub accepted: u32,
    pub dropped: u32,
}

pub struct MeasurementLoop<S, P, D> {
    sensor: S,
    presenter: P,
    delay: D,
    config: SamplingConfig,
    stats: SamplingStats,
}

impl<S, P, D> MeasurementLoop<S, P, D>
where
    S: Sensor,
    P: Presenter,
    D: DelayNs,
{
    pub fn new(sensor: S, presenter: P, delay: D, config: SamplingConfig) -> Self {
        Self {
            sensor,
            presenter,
            delay,
            config,
            stats: SamplingStats::default(),
        }
    }

    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Wait one interval, then measure once.
    pub async fn tick(&mut self) -> TickOutcome {
        self.delay.delay_ms(self.config.interval_ms).await;

        match self.sensor.measure().await {
            Ok(reading) if reading.valid => {
                info!(
                    "Humidity {:.2}, Temperature: {:.2}",
                    reading.relative_humidity, reading.temperature
                );
                self.presenter.present(&reading);
                self.stats.accepted = self.stats.accepted.wrapping_add(1);
                TickOutcome::Accepted(reading)
            }
            Ok(reading) => {
                warn!("Measurement rejected: reading marked invalid");
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                TickOutcome::Rejected(reading)
            }
            Err(e) => {
                warn!("Measurement dropped: {}", e);
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                TickOutcome::Dropped(e)
            }
        }
    }

    /// Sample forever.
    pub async fn run(mut self) -> ! {
        loop {
            self.tick().await;
        }
    }
}
