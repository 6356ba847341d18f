//! Per-channel configuration and edge-timing state machine
//!
//! Each monitored echo line carries its own small state machine: `Idle`
//! (no unmatched rising edge) or `Armed` (rising edge recorded, waiting
//! for the echo's falling edge). Completed intervals become distance
//! samples; every second sample completes a pair ready for averaging.

use serde::{Deserialize, Serialize};

use crate::sonar::distance::{DistanceConverter, DistanceError};
use crate::sonar::event::ChannelId;

/// Distance samples per averaged measurement
pub const SAMPLES_PER_MEASUREMENT: usize = 2;

/// Static configuration for one monitored echo line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// GPIO line offset of the echo input
    pub channel: ChannelId,
    /// Human-readable dimension name ("length", "width", "height")
    pub name: String,
    /// Calibrated sensor-to-zero-point distance in centimetres
    pub baseline_cm: f64,
}

/// Outcome of a falling edge applied to a channel's state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallingOutcome {
    /// Interval completed; first sample of a pair recorded
    Sampled(f64),
    /// Interval completed the second sample; buffer drained into the pair
    Pair([f64; 2]),
    /// No rising edge was pending; the edge is ignored
    Stray,
    /// Falling timestamp preceded the pending rising edge; sample discarded
    InvalidInterval {
        /// The pending rising timestamp that was discarded with the sample
        rising_ns: u64,
    },
}

/// Mutable timing state for one echo line
///
/// Owned exclusively by the engine's dispatch path; never shared between
/// threads.
#[derive(Debug, Default)]
pub struct ChannelState {
    /// Timestamp of the most recent rising edge not yet matched
    pending_rising: Option<u64>,
    /// Distances accumulated since the last averaging, at most two
    samples: Vec<f64>,
}

impl ChannelState {
    /// Create an idle channel state
    pub fn new() -> Self {
        Self {
            pending_rising: None,
            samples: Vec::with_capacity(SAMPLES_PER_MEASUREMENT),
        }
    }

    /// Whether a rising edge is pending (the `Armed` state)
    pub fn is_armed(&self) -> bool {
        self.pending_rising.is_some()
    }

    /// Number of buffered distance samples (0 or 1 between events)
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Record a rising edge, arming the channel
    ///
    /// A rising edge arriving while one is already pending overwrites it:
    /// the earlier transmit never produced an echo and its timestamp is
    /// useless for any later falling edge. Returns the discarded
    /// timestamp when that happens. A stale unflushed sample pair is
    /// cleared before arming.
    pub fn on_rising(&mut self, timestamp_ns: u64) -> Option<u64> {
        if self.samples.len() >= SAMPLES_PER_MEASUREMENT {
            self.samples.clear();
        }
        self.pending_rising.replace(timestamp_ns)
    }

    /// Apply a falling edge, completing an interval when armed
    pub fn on_falling(
        &mut self,
        timestamp_ns: u64,
        converter: &DistanceConverter,
    ) -> FallingOutcome {
        let Some(rising_ns) = self.pending_rising.take() else {
            return FallingOutcome::Stray;
        };
        match converter.distance_cm(rising_ns, timestamp_ns) {
            Ok(distance_cm) => {
                self.samples.push(distance_cm);
                if self.samples.len() == SAMPLES_PER_MEASUREMENT {
                    let pair = [self.samples[0], self.samples[1]];
                    self.samples.clear();
                    FallingOutcome::Pair(pair)
                } else {
                    FallingOutcome::Sampled(distance_cm)
                }
            }
            Err(DistanceError::InvalidInterval { .. }) => {
                FallingOutcome::InvalidInterval { rising_ns }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> DistanceConverter {
        DistanceConverter::default()
    }

    #[test]
    fn test_starts_idle() {
        let state = ChannelState::new();
        assert!(!state.is_armed());
        assert_eq!(state.sample_count(), 0);
    }

    #[test]
    fn test_rising_arms() {
        let mut state = ChannelState::new();
        assert_eq!(state.on_rising(100), None);
        assert!(state.is_armed());
    }

    #[test]
    fn test_falling_while_idle_is_stray() {
        let mut state = ChannelState::new();
        assert_eq!(state.on_falling(577_200, &converter()), FallingOutcome::Stray);
        assert!(!state.is_armed());
        assert_eq!(state.sample_count(), 0);
    }

    #[test]
    fn test_complete_interval_yields_sample() {
        let mut state = ChannelState::new();
        state.on_rising(0);
        let outcome = state.on_falling(577_200, &converter());
        assert_eq!(outcome, FallingOutcome::Sampled(10.0));
        assert!(!state.is_armed(), "match returns the channel to idle");
        assert_eq!(state.sample_count(), 1);
    }

    #[test]
    fn test_second_sample_completes_pair() {
        let mut state = ChannelState::new();
        state.on_rising(0);
        state.on_falling(577_200, &converter());
        state.on_rising(1_000_000);
        let outcome = state.on_falling(1_600_000, &converter());
        assert_eq!(outcome, FallingOutcome::Pair([10.0, 10.4]));
        assert_eq!(state.sample_count(), 0, "pair drains the buffer");
    }

    #[test]
    fn test_double_rising_overwrites() {
        let mut state = ChannelState::new();
        assert_eq!(state.on_rising(0), None);
        assert_eq!(state.on_rising(100), Some(0));
        // Distance computed from the second rising edge, not the first
        let outcome = state.on_falling(577_300, &converter());
        assert_eq!(outcome, FallingOutcome::Sampled(10.0));
    }

    #[test]
    fn test_invalid_interval_discards_sample_and_disarms() {
        let mut state = ChannelState::new();
        state.on_rising(577_200);
        let outcome = state.on_falling(100, &converter());
        assert_eq!(outcome, FallingOutcome::InvalidInterval { rising_ns: 577_200 });
        assert!(!state.is_armed());
        assert_eq!(state.sample_count(), 0);
    }

    #[test]
    fn test_recovers_after_invalid_interval() {
        let mut state = ChannelState::new();
        state.on_rising(577_200);
        state.on_falling(100, &converter());
        // Next well-formed cycle is unaffected
        state.on_rising(1_000_000);
        let outcome = state.on_falling(1_577_200, &converter());
        assert_eq!(outcome, FallingOutcome::Sampled(10.0));
    }
}
