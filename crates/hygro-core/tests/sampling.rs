mod common;

use std::collections::VecDeque;

use common::{FakeBus, RecordingDelay, SimState, capture_logs, captured_logs, corrupted_frame, valid_frame};
use embassy_futures::block_on;
use hygro_core::config::SamplingConfig;
use hygro_core::sampling::{MeasurementLoop, Presenter, SamplingStats, TickOutcome};
use hygro_core::sensors::{Aht20, MeasureError, Sensor, SensorReading};

#[derive(Default)]
struct RecordingPresenter {
    shown: Vec<SensorReading>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, reading: &SensorReading) {
        self.shown.push(*reading);
    }
}

/// Sensor returning a fixed script of results.
struct ScriptedSensor {
    script: VecDeque<Result<SensorReading, MeasureError>>,
    calls: u32,
}

impl ScriptedSensor {
    fn new(script: impl IntoIterator<Item = Result<SensorReading, MeasureError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: 0,
        }
    }
}

impl Sensor for ScriptedSensor {
    async fn measure(&mut self) -> Result<SensorReading, MeasureError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or(Err(MeasureError::FrameNotReady))
    }
}

fn config(interval_ms: u32) -> SamplingConfig {
    SamplingConfig { interval_ms }
}

#[test]
fn test_tick_waits_interval_before_measuring() {
    let delay = RecordingDelay::default();
    let sensor = ScriptedSensor::new([Ok(SensorReading::new(20.0, 40.0))]);
    let mut sampler =
        MeasurementLoop::new(sensor, RecordingPresenter::default(), delay.clone(), config(250));

    let outcome = block_on(sampler.tick());
    assert_eq!(outcome, TickOutcome::Accepted(SensorReading::new(20.0, 40.0)));
    assert_eq!(delay.elapsed_ms(), 250);
    assert_eq!(sampler.presenter().shown.len(), 1);
}

#[test]
fn test_failed_measurement_is_dropped_without_retry() {
    let sensor = ScriptedSensor::new([
        Err(MeasureError::Busy { polls: 10 }),
        Ok(SensorReading::new(21.0, 45.0)),
    ]);
    let delay = RecordingDelay::default();
    let mut sampler =
        MeasurementLoop::new(sensor, RecordingPresenter::default(), delay.clone(), config(250));

    let first = block_on(sampler.tick());
    assert_eq!(first, TickOutcome::Dropped(MeasureError::Busy { polls: 10 }));
    assert_eq!(sampler.sensor().calls, 1);
    assert!(sampler.presenter().shown.is_empty());

    let second = block_on(sampler.tick());
    assert!(matches!(second, TickOutcome::Accepted(_)));
    assert_eq!(sampler.sensor().calls, 2);
    // No backoff: every tick waits exactly one interval
    assert_eq!(delay.elapsed_ms(), 500);

    assert_eq!(
        sampler.stats(),
        SamplingStats {
            accepted: 1,
            dropped: 1,
        }
    );
}

#[test]
fn test_invalid_reading_is_not_presented() {
    let mut invalid = SensorReading::new(21.0, 45.0);
    invalid.valid = false;
    let sensor = ScriptedSensor::new([Ok(invalid)]);
    let mut sampler = MeasurementLoop::new(
        sensor,
        RecordingPresenter::default(),
        RecordingDelay::default(),
        config(250),
    );

    assert_eq!(block_on(sampler.tick()), TickOutcome::Rejected(invalid));
    assert!(sampler.presenter().shown.is_empty());
    assert_eq!(sampler.stats().dropped, 1);
}

#[test]
fn test_logs_accepted_and_dropped_measurements() {
    capture_logs();
    let sensor = ScriptedSensor::new([
        Ok(SensorReading::new(23.4, 55.0)),
        Err(MeasureError::ChecksumMismatch {
            expected: 0x12,
            actual: 0x34,
        }),
    ]);
    let mut sampler = MeasurementLoop::new(
        sensor,
        RecordingPresenter::default(),
        RecordingDelay::default(),
        config(250),
    );

    block_on(sampler.tick());
    block_on(sampler.tick());

    let logs = captured_logs();
    let info: Vec<_> = logs
        .iter()
        .filter(|(level, _)| *level == log::Level::Info)
        .map(|(_, line)| line.as_str())
        .collect();
    assert_eq!(info, ["Humidity 55.00, Temperature: 23.40"]);

    let warnings: Vec<_> = logs
        .iter()
        .filter(|(level, _)| *level == log::Level::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].1.starts_with("Measurement dropped: checksum mismatch"));
}

#[test]
fn test_one_trigger_per_tick_on_real_driver() {
    let bus = FakeBus::new(SimState {
        calibrate_after: Some(0),
        busy_polls: None,
        ..SimState::default()
    });
    let device = block_on(Aht20::new(bus.clone(), RecordingDelay::default()).initialize()).unwrap();
    let mut sampler = MeasurementLoop::new(
        device,
        RecordingPresenter::default(),
        RecordingDelay::default(),
        config(250),
    );

    for _ in 0..3 {
        assert_eq!(
            block_on(sampler.tick()),
            TickOutcome::Dropped(MeasureError::Busy { polls: 10 })
        );
    }

    bus.with(|s| {
        assert_eq!(s.triggers, 3);
        assert_eq!(s.frame_reads, 0);
    });
    assert_eq!(sampler.stats().dropped, 3);
}

#[test]
fn test_presenter_keeps_last_good_reading_across_drops() {
    let bus = FakeBus::ready();
    bus.push_frame(valid_frame(55.0, 23.4));
    bus.push_frame(corrupted_frame(60.0, 30.0));
    let device = block_on(Aht20::new(bus.clone(), RecordingDelay::default()).initialize()).unwrap();
    let mut sampler = MeasurementLoop::new(
        device,
        RecordingPresenter::default(),
        RecordingDelay::default(),
        config(250),
    );

    block_on(sampler.tick());
    block_on(sampler.tick());

    let shown = &sampler.presenter().shown;
    assert_eq!(shown.len(), 1);
    assert!((shown[0].temperature - 23.4).abs() < 0.01);
}

#[test]
fn test_measurements_never_overlap() {
    use common::BusEvent;

    let bus = FakeBus::new(SimState {
        calibrate_after: Some(0),
        busy_polls: Some(2),
        ..SimState::default()
    });
    let device = block_on(Aht20::new(bus.clone(), RecordingDelay::default()).initialize()).unwrap();
    let mut sampler = MeasurementLoop::new(
        device,
        RecordingPresenter::default(),
        RecordingDelay::default(),
        config(250),
    );

    for _ in 0..3 {
        assert!(matches!(block_on(sampler.tick()), TickOutcome::Accepted(_)));
    }

    // Every trigger is answered by its frame before the next trigger goes out
    bus.with(|s| {
        let mut in_flight = false;
        for event in &s.log {
            match event {
                BusEvent::Trigger => {
                    assert!(!in_flight, "trigger sent while a measurement was pending");
                    in_flight = true;
                }
                BusEvent::Frame => in_flight = false,
                _ => {}
            }
        }
        assert!(!in_flight);
        assert_eq!(s.triggers, 3);
        assert_eq!(s.frame_reads, 3);
    });
}
