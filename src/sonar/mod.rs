//! Edge-timing measurement module
//!
//! This module contains the measurement core:
//! - Edge event types ([`event`])
//! - Time-of-flight to distance conversion ([`distance`])
//! - Per-channel edge-timing state machine ([`channel`])
//! - Event dispatch and sample aggregation ([`engine`])
//! - Background edge-event consumption ([`listener`])

pub mod channel;
pub mod distance;
pub mod engine;
pub mod event;
pub mod listener;
