//! Edge-event source backed by the GPIO character device
//!
//! Requests the configured echo line offsets with both-edge detection and
//! exposes the kernel's timestamped edge events through [`EdgeSource`].
//! OS resources are released when the source is dropped.

use std::path::Path;
use std::time::Duration;

use gpiocdev::line::{EdgeDetection, EdgeKind as CdevEdgeKind};
use gpiocdev::Request;

use crate::sonar::event::{ChannelId, EdgeEvent, EdgeKind};
use crate::sonar::listener::{EdgeSource, SourceError};

/// Edge-event subscription on one GPIO chip
pub struct GpioEdgeSource {
    request: Request,
}

impl GpioEdgeSource {
    /// Open `chip` and subscribe to both edges on the given line offsets
    ///
    /// # Arguments
    /// * `chip` - chip device path, e.g. `/dev/gpiochip0`
    /// * `lines` - echo line offsets to monitor
    pub fn open(chip: &str, lines: &[ChannelId]) -> Result<Self, SourceError> {
        if !Path::new(chip).exists() {
            return Err(SourceError::DeviceNotFound(chip.to_string()));
        }
        let request = Request::builder()
            .on_chip(chip)
            .with_consumer("echoruler")
            .with_lines(lines)
            .with_edge_detection(EdgeDetection::BothEdges)
            .request()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        tracing::info!(chip, ?lines, "edge subscription requested");
        Ok(Self { request })
    }
}

impl EdgeSource for GpioEdgeSource {
    fn read_events(&mut self, timeout: Duration) -> Result<Vec<EdgeEvent>, SourceError> {
        let ready = self
            .request
            .wait_edge_event(timeout)
            .map_err(|e| SourceError::Read(e.to_string()))?;
        if !ready {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        while self
            .request
            .has_edge_event()
            .map_err(|e| SourceError::Read(e.to_string()))?
        {
            let event = self
                .request
                .read_edge_event()
                .map_err(|e| SourceError::Read(e.to_string()))?;
            events.push(EdgeEvent {
                channel: event.offset,
                kind: match event.kind {
                    CdevEdgeKind::Rising => EdgeKind::Rising,
                    CdevEdgeKind::Falling => EdgeKind::Falling,
                },
                timestamp_ns: event.timestamp_ns,
                seq: u64::from(event.line_seqno),
            });
        }
        Ok(events)
    }
}
