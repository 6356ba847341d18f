//! Echo time-of-flight to distance conversion
//!
//! An ultrasonic ping travels to the target and back, so the conversion
//! constant is *round-trip* microseconds per centimetre. The default of
//! `57.72` is calibrated against the reference rig rather than derived
//! from the nominal speed of sound; every deployment should tune it.

use thiserror::Error;

/// Errors from interval-to-distance conversion
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DistanceError {
    /// The falling edge carried a timestamp earlier than its rising pair.
    /// Cannot happen under correct kernel sequencing, but a reordered or
    /// replayed event stream must not turn into a negative distance.
    #[error("falling edge at {falling_ns}ns precedes rising edge at {rising_ns}ns")]
    InvalidInterval {
        /// Timestamp of the pending rising edge
        rising_ns: u64,
        /// Timestamp of the offending falling edge
        falling_ns: u64,
    },
}

/// Converts rising→falling echo intervals into centimetres
///
/// # Example
/// ```
/// use echoruler::sonar::distance::DistanceConverter;
///
/// let converter = DistanceConverter::new(57.72);
/// // 577.2µs of round trip is exactly 10cm at the default calibration
/// assert_eq!(converter.distance_cm(0, 577_200).unwrap(), 10.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DistanceConverter {
    /// Round-trip microseconds per centimetre
    calibration_us_per_cm: f64,
}

impl DistanceConverter {
    /// Create a converter with the given calibration constant
    pub fn new(calibration_us_per_cm: f64) -> Self {
        Self {
            calibration_us_per_cm,
        }
    }

    /// Get the calibration constant
    pub fn calibration_us_per_cm(&self) -> f64 {
        self.calibration_us_per_cm
    }

    /// Convert an echo interval into centimetres, rounded to one decimal
    ///
    /// # Arguments
    /// * `rising_ns` - timestamp of the rising edge (transmit)
    /// * `falling_ns` - timestamp of the falling edge (echo return)
    pub fn distance_cm(&self, rising_ns: u64, falling_ns: u64) -> Result<f64, DistanceError> {
        if falling_ns < rising_ns {
            return Err(DistanceError::InvalidInterval {
                rising_ns,
                falling_ns,
            });
        }
        let delta_ns = (falling_ns - rising_ns) as f64;
        Ok(round1(delta_ns / 1000.0 / self.calibration_us_per_cm))
    }
}

impl Default for DistanceConverter {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CALIBRATION_US_PER_CM)
    }
}

/// Round to one decimal place, the resolution all measurements are reported at
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
