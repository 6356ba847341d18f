//! Background consumption of edge events
//!
//! The [`EdgeListener`] runs one dedicated thread per engine, pulling
//! event batches from an [`EdgeSource`] and feeding them into
//! [`TimingEngine::dispatch`]. Cancellation is cooperative: `stop()` sets
//! a flag observed between reads and joins the thread, so no dispatch
//! happens after `stop()` returns. Worst-case shutdown latency is one
//! read timeout plus one retry sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::sonar::engine::TimingEngine;
use crate::sonar::event::EdgeEvent;

/// Errors from an edge-event source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The underlying device path does not exist
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    /// Requesting lines from the device failed
    #[error("gpio request failed: {0}")]
    Request(String),
    /// Reading edge events failed (transient; the listener retries)
    #[error("edge read failed: {0}")]
    Read(String),
    /// Driving a trigger line failed
    #[error("trigger write failed: {0}")]
    Write(String),
}

/// A source of timestamped edge events
///
/// Implemented by the GPIO character device in production and by fakes in
/// tests. An empty batch means the wait timed out with nothing pending,
/// which is not an error.
pub trait EdgeSource: Send {
    /// Block up to `timeout` for events and return all that are pending
    fn read_events(&mut self, timeout: Duration) -> Result<Vec<EdgeEvent>, SourceError>;
}

/// Consumption loop lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// No consumer thread is running
    Stopped,
    /// The consumer thread is pulling events
    Running,
}

/// Owns the consumption thread for one engine
///
/// The source and engine live inside the listener: while stopped they sit
/// in an idle slot, while running they are moved into the worker thread
/// and handed back when it exits, so the listener can be restarted.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use echoruler::sonar::listener::EdgeListener;
/// # fn demo(source: impl echoruler::EdgeSource + 'static, engine: echoruler::TimingEngine) {
/// let mut listener = EdgeListener::new(source, engine, Duration::from_millis(100));
/// listener.start();
/// // ... measurements flow through the engine callback ...
/// listener.stop(); // joins; no dispatch after this returns
/// # }
/// ```
pub struct EdgeListener<S: EdgeSource + 'static> {
    poll_timeout: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<(S, TimingEngine)>>,
    idle: Option<(S, TimingEngine)>,
}

impl<S: EdgeSource + 'static> EdgeListener<S> {
    /// Create a stopped listener
    ///
    /// `poll_timeout` bounds each blocking read; it is also the retry
    /// sleep after a transient read error and therefore the loop cadence.
    pub fn new(source: S, engine: TimingEngine, poll_timeout: Duration) -> Self {
        Self {
            poll_timeout,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            idle: Some((source, engine)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ListenerState {
        if self.worker.is_some() {
            ListenerState::Running
        } else {
            ListenerState::Stopped
        }
    }

    /// Borrow the engine while stopped (None while the worker owns it)
    pub fn engine(&self) -> Option<&TimingEngine> {
        self.idle.as_ref().map(|(_, engine)| engine)
    }

    /// Start the consumption thread
    ///
    /// Idempotent: starting a running listener does nothing, so at most
    /// one consumer thread exists per engine.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            tracing::debug!("edge listener already running");
            return;
        }
        let Some((mut source, mut engine)) = self.idle.take() else {
            // Unreachable unless a previous worker panicked and took the
            // source and engine down with it.
            tracing::error!("edge listener has no source to run");
            return;
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let poll_timeout = self.poll_timeout;

        self.worker = Some(thread::spawn(move || {
            tracing::debug!("edge listener started");
            while running.load(Ordering::SeqCst) {
                match source.read_events(poll_timeout) {
                    Ok(events) => {
                        for event in events {
                            engine.dispatch(event);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "edge read failed, retrying");
                        thread::sleep(poll_timeout);
                    }
                }
            }
            tracing::debug!("edge listener exiting");
            (source, engine)
        }));
    }

    /// Stop the consumption thread and wait for it to exit
    ///
    /// Idempotent. On return the worker has been joined and the engine is
    /// back in the idle slot.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(pair) => {
                    self.idle = Some(pair);
                    tracing::debug!("edge listener stopped");
                }
                Err(_) => {
                    tracing::error!("edge listener thread panicked");
                }
            }
        }
    }
}

impl<S: EdgeSource + 'static> Drop for EdgeListener<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
