//! E2E tests for the edge-timing engine
//!
//! Drives the engine with hand-built edge streams and checks the
//! measurement semantics: pairing, averaging, baseline subtraction,
//! stray-edge tolerance and channel isolation.

use crossbeam_channel::{unbounded, Receiver};
use echoruler::sonar::channel::ChannelConfig;
use echoruler::sonar::distance::DistanceConverter;
use echoruler::{EdgeEvent, EdgeKind, Measurement, TimingEngine};

fn config(channel: u32, name: &str, baseline_cm: f64) -> ChannelConfig {
    ChannelConfig {
        channel,
        name: name.to_string(),
        baseline_cm,
    }
}

fn engine(configs: Vec<ChannelConfig>) -> (TimingEngine, Receiver<Measurement>) {
    let (tx, rx) = unbounded();
    let engine = TimingEngine::new(configs, DistanceConverter::default(), move |m| {
        let _ = tx.send(m);
    })
    .unwrap();
    (engine, rx)
}

fn rising(channel: u32, timestamp_ns: u64, seq: u64) -> EdgeEvent {
    EdgeEvent::new(channel, EdgeKind::Rising, timestamp_ns, seq)
}

fn falling(channel: u32, timestamp_ns: u64, seq: u64) -> EdgeEvent {
    EdgeEvent::new(channel, EdgeKind::Falling, timestamp_ns, seq)
}

/// A falling edge with no prior rising edge yields no measurement
#[test]
fn test_stray_falling_edge_is_tolerated() {
    let (mut engine, results) = engine(vec![config(69, "length", 85.0)]);

    engine.dispatch(falling(69, 577_200, 1));

    assert!(results.try_recv().is_err());
    assert_eq!(engine.anomalies().stray_edges, 1);

    // The channel still measures normally afterwards
    engine.dispatch(rising(69, 1_000_000, 2));
    engine.dispatch(falling(69, 1_577_200, 3));
    engine.dispatch(rising(69, 2_000_000, 4));
    engine.dispatch(falling(69, 2_577_200, 5));
    assert!(results.try_recv().is_ok());
}

/// Two well-formed cycles produce exactly one averaged measurement
#[test]
fn test_two_cycles_average_into_one_measurement() {
    let (mut engine, results) = engine(vec![config(79, "height", 34.0)]);

    // 577200ns -> 10.0cm, 600000ns -> 10.4cm
    engine.dispatch(rising(79, 0, 1));
    engine.dispatch(falling(79, 577_200, 2));
    engine.dispatch(rising(79, 1_000_000, 3));
    engine.dispatch(falling(79, 1_600_000, 4));

    let m = results.try_recv().unwrap();
    assert_eq!(m.channel, 79);
    assert_eq!(m.distance_avg_cm, 10.2);
    assert_eq!(m.dimension_cm, 23.8);
    assert!(results.try_recv().is_err(), "exactly one measurement");
}

/// The reference calibration: 577.2µs of round trip is 10.0cm exactly
#[test]
fn test_reference_distance_is_exact() {
    let converter = DistanceConverter::new(57.72);
    assert_eq!(converter.distance_cm(0, 577_200).unwrap(), 10.0);
}

/// A second rising edge before any falling edge discards the first
#[test]
fn test_double_rising_uses_latest_timestamp() {
    let (mut engine, results) = engine(vec![config(69, "length", 85.0)]);

    engine.dispatch(rising(69, 0, 1));
    engine.dispatch(rising(69, 100, 2));
    // Falling at 577_300: only correct if measured against t=100
    engine.dispatch(falling(69, 577_200 + 100, 3));

    engine.dispatch(rising(69, 1_000_000, 4));
    engine.dispatch(falling(69, 1_577_200, 5));

    let m = results.try_recv().unwrap();
    assert_eq!(m.distance_avg_cm, 10.0);
    assert_eq!(m.dimension_cm, 75.0);
}

/// Interleaved dispatch equals per-channel sequential dispatch
#[test]
fn test_channels_are_isolated() {
    let configs = vec![config(69, "length", 85.0), config(75, "width", 47.0)];

    // Interleaved stream across both channels
    let interleaved = vec![
        rising(69, 0, 1),
        rising(75, 50, 1),
        falling(75, 577_250, 2),
        falling(69, 577_200, 2),
        rising(75, 1_000_000, 3),
        rising(69, 1_100_000, 3),
        falling(69, 1_700_000, 4),
        falling(75, 1_600_000, 4),
    ];

    let (mut engine_both, results_both) = engine(configs.clone());
    for event in &interleaved {
        engine_both.dispatch(*event);
    }
    let mut combined: Vec<Measurement> = results_both.try_iter().collect();
    combined.sort_by_key(|m| m.channel);

    let mut separate = Vec::new();
    for &channel in &[69, 75] {
        let (mut engine_one, results_one) = engine(configs.clone());
        for event in interleaved.iter().filter(|e| e.channel == channel) {
            engine_one.dispatch(*event);
        }
        separate.extend(results_one.try_iter());
    }
    separate.sort_by_key(|m| m.channel);

    assert_eq!(combined, separate);
    assert_eq!(combined.len(), 2);
}

/// Events for unconfigured lines are dropped without disturbing others
#[test]
fn test_unknown_channel_events_are_dropped() {
    let (mut engine, results) = engine(vec![config(69, "length", 85.0)]);

    engine.dispatch(rising(42, 0, 1));
    engine.dispatch(falling(42, 577_200, 2));
    assert_eq!(engine.anomalies().unknown_channels, 2);

    engine.dispatch(rising(69, 0, 1));
    engine.dispatch(falling(69, 577_200, 2));
    engine.dispatch(rising(69, 1_000_000, 3));
    engine.dispatch(falling(69, 1_577_200, 4));

    let m = results.try_recv().unwrap();
    assert_eq!(m.channel, 69);
    assert_eq!(m.distance_avg_cm, 10.0);
}

/// A reordered falling edge discards that sample but not the channel
#[test]
fn test_invalid_interval_recovery() {
    let (mut engine, results) = engine(vec![config(75, "width", 47.0)]);

    engine.dispatch(rising(75, 500_000, 1));
    engine.dispatch(falling(75, 100, 2));
    assert_eq!(engine.anomalies().invalid_intervals, 1);
    assert!(results.try_recv().is_err());

    engine.dispatch(rising(75, 1_000_000, 3));
    engine.dispatch(falling(75, 1_577_200, 4));
    engine.dispatch(rising(75, 2_000_000, 5));
    engine.dispatch(falling(75, 2_577_200, 6));

    let m = results.try_recv().unwrap();
    assert_eq!(m.distance_avg_cm, 10.0);
    assert_eq!(m.dimension_cm, 37.0);
}

/// Duplicate line offsets are rejected at construction
#[test]
fn test_duplicate_channel_fails_construction() {
    let result = TimingEngine::new(
        vec![config(69, "length", 85.0), config(69, "width", 47.0)],
        DistanceConverter::default(),
        |_| {},
    );
    assert!(result.is_err());
}
