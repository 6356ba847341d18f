//! Event dispatch and sample aggregation
//!
//! The [`TimingEngine`] owns one [`ChannelState`] per configured channel,
//! routes each incoming edge to it, and turns completed sample pairs into
//! averaged [`Measurement`]s delivered through a caller-supplied callback.
//!
//! Per-event anomalies (stray falling edges, reordered timestamps, edges
//! for unmonitored lines) are counted and logged but never abort
//! dispatch: one malformed edge must not corrupt measurement of the
//! cycles that follow it.

use std::collections::HashMap;

use thiserror::Error;

use crate::sonar::channel::{ChannelConfig, ChannelState, FallingOutcome};
use crate::sonar::distance::{round1, DistanceConverter};
use crate::sonar::event::{ChannelId, EdgeEvent, EdgeKind};

/// Errors from engine construction
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two channel configurations share the same line offset
    #[error("duplicate channel {0} in configuration")]
    DuplicateChannel(ChannelId),
}

/// One averaged dimension measurement for a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Line offset the measurement was taken on
    pub channel: ChannelId,
    /// Dimension name from the channel configuration
    pub name: String,
    /// Average of the two distance samples, centimetres
    pub distance_avg_cm: f64,
    /// Baseline minus average distance: the measured dimension, centimetres
    pub dimension_cm: f64,
}

/// Counts of per-event anomalies recovered during dispatch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnomalyCounters {
    /// Falling edges that arrived with no rising edge pending
    pub stray_edges: u64,
    /// Falling edges whose timestamp preceded their rising pair
    pub invalid_intervals: u64,
    /// Events for line offsets not in the configuration
    pub unknown_channels: u64,
}

struct ChannelSlot {
    config: ChannelConfig,
    state: ChannelState,
}

type ResultCallback = Box<dyn FnMut(Measurement) + Send>;

/// Multi-channel edge-timing engine
///
/// All state transitions happen through [`dispatch`](Self::dispatch),
/// which is intended to be driven by a single consumer thread (see
/// [`EdgeListener`](crate::sonar::listener::EdgeListener)). The result
/// callback runs synchronously on that thread; callers needing to do
/// blocking work with results should hand them off through a bounded
/// channel instead of working inside the callback.
pub struct TimingEngine {
    channels: HashMap<ChannelId, ChannelSlot>,
    converter: DistanceConverter,
    on_result: ResultCallback,
    anomalies: AnomalyCounters,
    measurement_count: u64,
}

impl TimingEngine {
    /// Create an engine for the given channels
    ///
    /// # Arguments
    /// * `configs` - one entry per monitored line; offsets must be unique
    /// * `converter` - interval-to-distance conversion with its calibration
    /// * `on_result` - invoked once per completed measurement
    pub fn new(
        configs: Vec<ChannelConfig>,
        converter: DistanceConverter,
        on_result: impl FnMut(Measurement) + Send + 'static,
    ) -> Result<Self, EngineError> {
        let mut channels = HashMap::with_capacity(configs.len());
        for config in configs {
            let channel = config.channel;
            let slot = ChannelSlot {
                config,
                state: ChannelState::new(),
            };
            if channels.insert(channel, slot).is_some() {
                return Err(EngineError::DuplicateChannel(channel));
            }
        }
        Ok(Self {
            channels,
            converter,
            on_result: Box::new(on_result),
            anomalies: AnomalyCounters::default(),
            measurement_count: 0,
        })
    }

    /// Number of configured channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Anomaly counts accumulated so far
    pub fn anomalies(&self) -> AnomalyCounters {
        self.anomalies
    }

    /// Number of measurements emitted so far
    pub fn measurement_count(&self) -> u64 {
        self.measurement_count
    }

    /// Route one edge event to its channel's state machine
    ///
    /// Events for unconfigured channels are dropped and counted; nothing
    /// here panics or returns an error.
    pub fn dispatch(&mut self, event: EdgeEvent) {
        let Some(slot) = self.channels.get_mut(&event.channel) else {
            self.anomalies.unknown_channels += 1;
            tracing::debug!(
                channel = event.channel,
                seq = event.seq,
                "edge for unmonitored line dropped"
            );
            return;
        };

        match event.kind {
            EdgeKind::Rising => {
                if let Some(discarded_ns) = slot.state.on_rising(event.timestamp_ns) {
                    tracing::debug!(
                        channel = event.channel,
                        discarded_ns,
                        timestamp_ns = event.timestamp_ns,
                        "unmatched rising edge overwritten"
                    );
                }
            }
            EdgeKind::Falling => {
                match slot.state.on_falling(event.timestamp_ns, &self.converter) {
                    FallingOutcome::Sampled(distance_cm) => {
                        tracing::trace!(
                            channel = event.channel,
                            name = %slot.config.name,
                            distance_cm,
                            "distance sample"
                        );
                    }
                    FallingOutcome::Pair([first_cm, second_cm]) => {
                        let distance_avg_cm = round1((first_cm + second_cm) / 2.0);
                        let dimension_cm = round1(slot.config.baseline_cm - distance_avg_cm);
                        let measurement = Measurement {
                            channel: event.channel,
                            name: slot.config.name.clone(),
                            distance_avg_cm,
                            dimension_cm,
                        };
                        self.measurement_count += 1;
                        tracing::info!(
                            channel = event.channel,
                            name = %measurement.name,
                            distance_avg_cm,
                            dimension_cm,
                            "measurement"
                        );
                        (self.on_result)(measurement);
                    }
                    FallingOutcome::Stray => {
                        self.anomalies.stray_edges += 1;
                        tracing::debug!(
                            channel = event.channel,
                            seq = event.seq,
                            "falling edge with no pending rising edge"
                        );
                    }
                    FallingOutcome::InvalidInterval { rising_ns } => {
                        self.anomalies.invalid_intervals += 1;
                        tracing::warn!(
                            channel = event.channel,
                            rising_ns,
                            falling_ns = event.timestamp_ns,
                            "falling edge precedes its rising pair, sample discarded"
                        );
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TimingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingEngine")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("anomalies", &self.anomalies)
            .field("measurement_count", &self.measurement_count)
            .finish_non_exhaustive()
    }
}
