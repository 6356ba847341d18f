//! Time-series storage for measurements
//!
//! Keeps a bounded history of timestamped measurements plus running
//! min/max/avg statistics per channel, for status output and the
//! shutdown summary.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::sonar::engine::Measurement;
use crate::sonar::event::ChannelId;

/// Maximum number of records kept at full resolution
const MAX_HISTORY_SIZE: usize = 3600;

/// A single recorded measurement
#[derive(Debug, Clone)]
pub struct MeasurementRecord {
    /// When the measurement was recorded
    pub timestamp: DateTime<Utc>,
    /// Channel the measurement was taken on
    pub channel: ChannelId,
    /// Dimension name
    pub name: String,
    /// Averaged distance in centimetres
    pub distance_avg_cm: f64,
    /// Measured dimension in centimetres
    pub dimension_cm: f64,
}

/// Running statistics for one channel's dimension
#[derive(Debug, Clone)]
pub struct ChannelStats {
    /// Dimension name
    pub name: String,
    /// Number of measurements recorded
    pub count: u64,
    /// Smallest dimension observed (cm)
    pub min_cm: f64,
    /// Largest dimension observed (cm)
    pub max_cm: f64,
    /// Mean dimension (cm)
    pub avg_cm: f64,
    /// Most recent dimension (cm)
    pub last_cm: f64,
}

/// Statistics store for measurement history
#[derive(Debug, Default)]
pub struct StatsStore {
    history: VecDeque<MeasurementRecord>,
    per_channel: HashMap<ChannelId, ChannelStats>,
}

impl StatsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            per_channel: HashMap::new(),
        }
    }

    /// Record a measurement, evicting the oldest record when full
    pub fn record(&mut self, measurement: &Measurement) {
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(MeasurementRecord {
            timestamp: Utc::now(),
            channel: measurement.channel,
            name: measurement.name.clone(),
            distance_avg_cm: measurement.distance_avg_cm,
            dimension_cm: measurement.dimension_cm,
        });

        let stats = self
            .per_channel
            .entry(measurement.channel)
            .or_insert_with(|| ChannelStats {
                name: measurement.name.clone(),
                count: 0,
                min_cm: f64::MAX,
                max_cm: f64::MIN,
                avg_cm: 0.0,
                last_cm: 0.0,
            });
        stats.count += 1;
        stats.min_cm = stats.min_cm.min(measurement.dimension_cm);
        stats.max_cm = stats.max_cm.max(measurement.dimension_cm);
        stats.last_cm = measurement.dimension_cm;
        stats.avg_cm += (measurement.dimension_cm - stats.avg_cm) / stats.count as f64;
    }

    /// All records, oldest first
    pub fn history(&self) -> impl Iterator<Item = &MeasurementRecord> {
        self.history.iter()
    }

    /// Statistics for one channel, if it has any measurements
    pub fn channel_stats(&self, channel: ChannelId) -> Option<&ChannelStats> {
        self.per_channel.get(&channel)
    }

    /// Per-channel statistics in channel order
    pub fn channels(&self) -> Vec<(ChannelId, &ChannelStats)> {
        let mut entries: Vec<_> = self
            .per_channel
            .iter()
            .map(|(&channel, stats)| (channel, stats))
            .collect();
        entries.sort_by_key(|(channel, _)| *channel);
        entries
    }

    /// Total measurements recorded since creation
    pub fn total_measurements(&self) -> u64 {
        self.per_channel.values().map(|s| s.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn measurement(channel: ChannelId, dimension_cm: f64) -> Measurement {
        Measurement {
            channel,
            name: "length".to_string(),
            distance_avg_cm: 10.0,
            dimension_cm,
        }
    }

    #[test]
    fn test_empty_store() {
        let store = StatsStore::new();
        assert_eq!(store.total_measurements(), 0);
        assert!(store.channel_stats(69).is_none());
        assert_eq!(store.history().count(), 0);
    }

    #[test]
    fn test_running_stats() {
        let mut store = StatsStore::new();
        store.record(&measurement(69, 20.0));
        store.record(&measurement(69, 22.0));
        store.record(&measurement(69, 21.0));

        let stats = store.channel_stats(69).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_cm, 20.0);
        assert_eq!(stats.max_cm, 22.0);
        assert_eq!(stats.last_cm, 21.0);
        assert_relative_eq!(stats.avg_cm, 21.0);
    }

    #[test]
    fn test_channels_sorted_by_id() {
        let mut store = StatsStore::new();
        store.record(&measurement(79, 23.0));
        store.record(&measurement(69, 20.0));
        let ids: Vec<_> = store.channels().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![69, 79]);
        assert_eq!(store.total_measurements(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = StatsStore::new();
        for i in 0..(MAX_HISTORY_SIZE + 10) {
            store.record(&measurement(69, i as f64));
        }
        assert_eq!(store.history().count(), MAX_HISTORY_SIZE);
        // Stats still cover every record
        assert_eq!(store.channel_stats(69).unwrap().count, (MAX_HISTORY_SIZE + 10) as u64);
    }
}
