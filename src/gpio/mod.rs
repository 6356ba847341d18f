//! Linux GPIO character-device collaborators
//!
//! Thin wrappers over the gpiochip uAPI:
//! - edge-event subscription for the echo lines ([`source`])
//! - trigger pulses that start each echo cycle ([`trigger`])

pub mod source;
pub mod trigger;

pub use source::GpioEdgeSource;
pub use trigger::TriggerPulser;
