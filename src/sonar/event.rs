//! Edge event types consumed by the timing engine
//!
//! Events are produced by an external edge source (the GPIO character
//! device in production, fakes in tests) and consumed exactly once by
//! [`TimingEngine::dispatch`](crate::sonar::engine::TimingEngine::dispatch).

/// GPIO line offset identifying one echo input channel
pub type ChannelId = u32;

/// Direction of a signal transition on an echo line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Line went high: the sensor started its echo pulse (transmit time)
    Rising,
    /// Line went low: the echo returned
    Falling,
}

/// A single timestamped edge observed on an echo line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Line offset the edge occurred on
    pub channel: ChannelId,
    /// Transition direction
    pub kind: EdgeKind,
    /// Monotonic kernel timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Per-line sequence number assigned by the event source
    pub seq: u64,
}

impl EdgeEvent {
    /// Shorthand constructor used throughout the tests
    pub fn new(channel: ChannelId, kind: EdgeKind, timestamp_ns: u64, seq: u64) -> Self {
        Self {
            channel,
            kind,
            timestamp_ns,
            seq,
        }
    }
}
