//! Echoruler - ultrasonic dimension measurement over GPIO edge timing
//!
//! This library measures physical distances (and the derived dimensions
//! length, width, height) with ultrasonic sensors wired to GPIO lines.
//! Each echo line delivers a pulse whose rising edge marks transmit time
//! and whose falling edge marks echo return; the elapsed time, scaled by
//! a per-setup speed-of-sound calibration, yields a distance sample. Two
//! consecutive samples per channel are averaged and subtracted from a
//! calibrated baseline to produce the measured dimension.

pub mod config;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod sonar;
pub mod stats;

pub use sonar::engine::{Measurement, TimingEngine};
pub use sonar::event::{ChannelId, EdgeEvent, EdgeKind};
pub use sonar::listener::{EdgeListener, EdgeSource};
pub use stats::store::StatsStore;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default echo calibration in round-trip microseconds per centimetre.
///
/// Empirically tuned against the reference rig, not the textbook speed of
/// sound. Sensor-specific; override via the config file.
pub const DEFAULT_CALIBRATION_US_PER_CM: f64 = 57.72;

/// Default bounded wait for one edge-event read (also the shutdown poll cadence)
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// Trigger pulse width in microseconds (drives a sensor's TRIG line high)
pub const TRIGGER_PULSE_MICROS: u64 = 1000;

/// Spacing between per-channel trigger pulses, so sensors sharing an
/// acoustic space do not hear each other's pings
pub const TRIGGER_SPACING_MS: u64 = 100;
