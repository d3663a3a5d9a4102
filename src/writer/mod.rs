//! Stream writer - the control loop
//!
//! Owns the source connection and the output sink, persists every event and
//! applies operator requests at its checkpoints.
//!
//! ```text
//!              ┌────────────── filter changed ──────────────┐
//!              ▼                                             │
//! ┌────────────────┐  connected  ┌───────────┐  rotation  ┌──────────┐
//! │   CONNECTING   │ ──────────► │ STREAMING │ ─────────► │ ROTATING │
//! └────────────────┘             └───────────┘ ◄───────── └──────────┘
//!   ▲          │ error               │ error
//!   │          ▼                     ▼
//!   │     ┌────────────────┐ ◄───────┘
//!   └──── │ RECONNECT_WAIT │
//!         └────────────────┘        stop (any checkpoint) ──► STOPPED
//! ```
//!
//! Checkpoints run after every delivery (event or idle tick) and before every
//! connection attempt; a stop also cuts the backoff pause short. Connection
//! errors are always retried. Anything else (encoding, sink I/O) ends the run.

mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use thiserror::Error;

use crate::config::RetryPolicy;
use crate::control::ControlInbox;
use crate::record::{EncodeError, JsonLineEncoder, RecordEncoder};
use crate::sink::{Sink, SinkError, SinkFactory};
use crate::stats::StatsTracker;
use crate::stream::{Connection, ConnectionError, Delivery, StreamSource};
use crate::types::{format_tags, Event, TagSet};

pub use status::{Phase, WriterStatus};

/// Result type for the control loop
pub type StreamResult<T> = Result<T, StreamError>;

/// Failures that end the control loop
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("no output is open")]
    OutputClosed,
    #[error("gave up after {attempts} consecutive connection failures: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ConnectionError,
    },
    #[error("failed to start writer thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("writer thread panicked")]
    Panicked,
}

/// Outcome of a run that reached STOPPED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Events written over the whole run
    pub events: u64,
    /// Rotations performed
    pub rotations: u64,
    /// Output in effect when the loop stopped
    pub output: PathBuf,
}

enum State {
    Connecting,
    Streaming(Box<dyn Connection>),
    ReconnectWait,
    Stopped,
}

enum Checkpoint {
    Proceed,
    Refilter,
    Stop,
}

/// The control loop
pub struct StreamWriter {
    source: Box<dyn StreamSource>,
    encoder: Box<dyn RecordEncoder>,
    sinks: Box<dyn SinkFactory>,
    sink: Option<Box<dyn Sink>>,
    inbox: ControlInbox,
    retry: RetryPolicy,
    stats: Arc<StatsTracker>,
    status: Arc<WriterStatus>,
    /// Filter the current (or next) connection uses
    tags: TagSet,
    /// Connection failures since the last delivered event
    failures: u32,
}

impl StreamWriter {
    /// Create a writer around an already opened initial sink
    pub fn new(
        source: Box<dyn StreamSource>,
        sinks: Box<dyn SinkFactory>,
        sink: Box<dyn Sink>,
        inbox: ControlInbox,
    ) -> Self {
        let status = Arc::new(WriterStatus::new(sink.path().to_path_buf()));
        let tags = inbox.initial_tags().clone();
        Self {
            source,
            encoder: Box::new(JsonLineEncoder),
            sinks,
            sink: Some(sink),
            inbox,
            retry: RetryPolicy::default(),
            stats: Arc::new(StatsTracker::new()),
            status,
            tags,
            failures: 0,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn stats(&self) -> Arc<StatsTracker> {
        Arc::clone(&self.stats)
    }

    pub fn status(&self) -> Arc<WriterStatus> {
        Arc::clone(&self.status)
    }

    /// Run the loop on a dedicated thread
    pub fn spawn(self) -> StreamResult<WriterThread> {
        let status = self.status();
        let handle = thread::Builder::new()
            .name("stream-writer".to_string())
            .spawn(move || self.run())
            .map_err(StreamError::Spawn)?;
        Ok(WriterThread { handle, status })
    }

    /// Run the loop on the calling thread until stopped or failed
    pub fn run(mut self) -> StreamResult<RunSummary> {
        let result = self.run_loop().and_then(|()| self.close_sink());

        match result {
            Ok(()) => {
                self.status.disconnected(Phase::Stopped);
                let summary = self.stats.summary();
                info!("Stream stopped: {}", summary);
                Ok(RunSummary {
                    events: summary.events,
                    rotations: summary.rotations,
                    output: self.status.output(),
                })
            }
            Err(e) => {
                error!("Stream writer terminated: {}", e);
                self.status.failed(e.to_string());
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> StreamResult<()> {
        let mut state = State::Connecting;
        loop {
            state = match state {
                State::Connecting => self.connect()?,
                State::Streaming(connection) => self.stream(connection)?,
                State::ReconnectWait => self.backoff(),
                State::Stopped => return Ok(()),
            };
        }
    }

    fn connect(&mut self) -> StreamResult<State> {
        self.status.disconnected(Phase::Connecting);
        if let Checkpoint::Stop = self.checkpoint()? {
            return Ok(State::Stopped);
        }

        info!("New stream with tags [{}]", format_tags(&self.tags));
        self.stats.record_connection_attempt();
        match self.source.connect(&self.tags) {
            Ok(connection) => {
                self.status.connected(&self.tags);
                Ok(State::Streaming(connection))
            }
            Err(e) => self.connection_failed(e),
        }
    }

    fn stream(&mut self, mut connection: Box<dyn Connection>) -> StreamResult<State> {
        loop {
            match connection.next_delivery() {
                Ok(Delivery::Event(event)) => self.write(&event)?,
                Ok(Delivery::Idle) => {}
                Err(e) => return self.connection_failed(e),
            }

            match self.checkpoint()? {
                Checkpoint::Proceed => {}
                Checkpoint::Refilter => {
                    info!("Filter changed, reconnecting");
                    return Ok(State::Connecting);
                }
                Checkpoint::Stop => return Ok(State::Stopped),
            }
        }
    }

    fn backoff(&mut self) -> State {
        self.status.disconnected(Phase::ReconnectWait);
        if self.inbox.wait(self.retry.backoff()).stop_requested() {
            State::Stopped
        } else {
            State::Connecting
        }
    }

    fn connection_failed(&mut self, e: ConnectionError) -> StreamResult<State> {
        self.failures += 1;
        if !self.retry.allows_retry(self.failures) {
            return Err(StreamError::RetriesExhausted {
                attempts: self.failures,
                last: e,
            });
        }

        warn!("Connection error ({}), restarting...", e);
        Ok(State::ReconnectWait)
    }

    fn write(&mut self, event: &Event) -> StreamResult<()> {
        let record = self.encoder.encode(event)?;
        self.sink
            .as_mut()
            .ok_or(StreamError::OutputClosed)?
            .append(&record)?;
        self.stats.record_event();
        self.failures = 0;
        Ok(())
    }

    /// Act on queued operator requests: stop, then rotation, then filter
    fn checkpoint(&mut self) -> StreamResult<Checkpoint> {
        let (rotation, tags) = {
            let pending = self.inbox.poll();
            if pending.stop_requested() {
                return Ok(Checkpoint::Stop);
            }
            (pending.take_rotation(), pending.take_tags())
        };

        if let Some(target) = rotation {
            self.rotate(target)?;
        }

        match tags {
            Some(tags) if tags != self.tags => {
                self.tags = tags;
                Ok(Checkpoint::Refilter)
            }
            _ => Ok(Checkpoint::Proceed),
        }
    }

    fn rotate(&mut self, target: PathBuf) -> StreamResult<()> {
        let resume = self.status.phase();
        self.status.set_phase(Phase::Rotating);

        self.close_sink()?;
        let sink = self.sinks.open_append(&target)?;
        info!("Moved output to {}", target.display());

        self.sink = Some(sink);
        self.status.set_output(&target);
        self.stats.record_rotation();
        self.status.set_phase(resume);
        Ok(())
    }

    fn close_sink(&mut self) -> StreamResult<()> {
        if let Some(sink) = self.sink.take() {
            sink.close()?;
        }
        Ok(())
    }
}

/// Handle to a control loop running on its own thread
pub struct WriterThread {
    handle: JoinHandle<StreamResult<RunSummary>>,
    status: Arc<WriterStatus>,
}

impl WriterThread {
    pub fn status(&self) -> &Arc<WriterStatus> {
        &self.status
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to end
    pub fn join(self) -> StreamResult<RunSummary> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                self.status.failed("writer thread panicked".to_string());
                Err(StreamError::Panicked)
            }
        }
    }
}
