//! Trigger-pulse generator for the sensors' TRIG lines
//!
//! An HC-SR04-style sensor starts a measurement when its trigger input is
//! pulsed high. One pulser owns all trigger lines of a chip and fires
//! them in sequence, spaced far enough apart that sensors sharing an
//! acoustic space cannot mistake each other's echoes for their own.

use std::path::Path;
use std::thread;
use std::time::Duration;

use gpiocdev::line::Value;
use gpiocdev::Request;

use crate::sonar::event::ChannelId;
use crate::sonar::listener::SourceError;

/// Drives trigger lines low-idle with periodic high pulses
pub struct TriggerPulser {
    request: Request,
    lines: Vec<ChannelId>,
    pulse: Duration,
    spacing: Duration,
}

impl TriggerPulser {
    /// Request the trigger line offsets on `chip` as outputs, initially low
    pub fn open(chip: &str, lines: &[ChannelId]) -> Result<Self, SourceError> {
        Self::with_timing(
            chip,
            lines,
            Duration::from_micros(crate::TRIGGER_PULSE_MICROS),
            Duration::from_millis(crate::TRIGGER_SPACING_MS),
        )
    }

    /// Like [`open`](Self::open) with explicit pulse width and spacing
    pub fn with_timing(
        chip: &str,
        lines: &[ChannelId],
        pulse: Duration,
        spacing: Duration,
    ) -> Result<Self, SourceError> {
        if !Path::new(chip).exists() {
            return Err(SourceError::DeviceNotFound(chip.to_string()));
        }
        let request = Request::builder()
            .on_chip(chip)
            .with_consumer("echoruler-trigger")
            .with_lines(lines)
            .as_output(Value::Inactive)
            .request()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        tracing::info!(chip, ?lines, "trigger lines requested");
        Ok(Self {
            request,
            lines: lines.to_vec(),
            pulse,
            spacing,
        })
    }

    /// Pulse every trigger line once, in configuration order
    ///
    /// Blocks for the whole cycle: lines × (pulse + spacing).
    pub fn pulse_cycle(&mut self) -> Result<(), SourceError> {
        for &line in &self.lines {
            self.request
                .set_value(line, Value::Active)
                .map_err(|e| SourceError::Write(e.to_string()))?;
            thread::sleep(self.pulse);
            self.request
                .set_value(line, Value::Inactive)
                .map_err(|e| SourceError::Write(e.to_string()))?;
            tracing::trace!(line, "trigger pulsed");
            thread::sleep(self.spacing);
        }
        Ok(())
    }

    /// Trigger line offsets this pulser drives
    pub fn lines(&self) -> &[ChannelId] {
        &self.lines
    }
}
