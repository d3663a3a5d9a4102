//! Operator control of the running crawler
//!
//! The command thread never touches the control loop's state directly. It owns
//! a [`ControlHandle`] that keeps the desired filter set and turns every
//! mutation into a [`ControlRequest`] sent over a channel. The control loop
//! owns the matching [`ControlInbox`] and only looks at it at its checkpoints
//! (after each delivery, before each connection attempt, during backoff).
//!
//! ```text
//! command thread                       control-loop thread
//! ┌───────────────┐   ControlRequest   ┌──────────────┐
//! │ ControlHandle │ ─────────────────► │ ControlInbox │ ─► PendingControl
//! └───────────────┘      (mpsc)        └──────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::types::TagSet;

/// Result type for operator requests
pub type ControlResult<T> = Result<T, ControlError>;

/// Operator input rejected before it reaches the control loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("tag '{0}' is not tracked")]
    UnknownTag(String),
    #[error("invalid output path '{0}'")]
    InvalidPath(String),
}

/// A state change requested by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Replace the filter with this set at the next reconnect
    Retag(TagSet),
    /// Close the current output and continue into this path
    Rotate(PathBuf),
    /// Close the output and end the run
    Stop,
}

/// Create a connected handle/inbox pair
///
/// `tags` is the filter the first connection is opened with and `output` the
/// path of the initial sink.
pub fn channel(tags: TagSet, output: PathBuf) -> (ControlHandle, ControlInbox) {
    let (tx, rx) = mpsc::channel();
    let handle = ControlHandle {
        tx,
        tags: tags.clone(),
        output,
        stop_sent: false,
    };
    let inbox = ControlInbox {
        rx,
        initial_tags: tags,
        pending: PendingControl::default(),
    };
    (handle, inbox)
}

/// Command-side view of the control state
pub struct ControlHandle {
    tx: Sender<ControlRequest>,
    tags: TagSet,
    output: PathBuf,
    stop_sent: bool,
}

impl ControlHandle {
    /// Union `tags` into the filter
    ///
    /// Returns the tags that were not tracked before. The filter change is
    /// signalled even when nothing new was added; the control loop ignores a
    /// filter identical to the one it is connected with.
    pub fn add_tags<I, S>(&mut self, tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for tag in tags {
            let tag = tag.into();
            if self.tags.insert(tag.clone()) {
                added.push(tag);
            }
        }
        self.send(ControlRequest::Retag(self.tags.clone()));
        added
    }

    /// Remove each of `tags` from the filter
    ///
    /// Tags are handled independently: an untracked tag yields
    /// [`ControlError::UnknownTag`] in its slot and does not undo removals of
    /// the other tags in the same call.
    pub fn remove_tags<I, S>(&mut self, tags: I) -> Vec<ControlResult<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let results: Vec<ControlResult<String>> = tags
            .into_iter()
            .map(|tag| {
                let tag = tag.into();
                if self.tags.remove(&tag) {
                    Ok(tag)
                } else {
                    Err(ControlError::UnknownTag(tag))
                }
            })
            .collect();

        if results.iter().any(Result::is_ok) {
            self.send(ControlRequest::Retag(self.tags.clone()));
        }
        results
    }

    /// Ask the control loop to continue writing into `path`
    pub fn request_rotation(&mut self, path: &str) -> ControlResult<PathBuf> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ControlError::InvalidPath(path.to_string()));
        }

        let target = PathBuf::from(trimmed);
        self.output = target.clone();
        self.send(ControlRequest::Rotate(target.clone()));
        Ok(target)
    }

    /// Ask the control loop to stop; repeated calls have no further effect
    pub fn request_stop(&mut self) {
        if !self.stop_sent {
            self.stop_sent = true;
            self.send(ControlRequest::Stop);
        }
    }

    /// Whether a stop has been requested through this handle
    pub fn stop_requested(&self) -> bool {
        self.stop_sent
    }

    /// Current desired filter
    pub fn snapshot_tags(&self) -> TagSet {
        self.tags.clone()
    }

    /// Most recently requested output path
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// A detached handle that can only request a stop
    pub fn stopper(&self) -> StopHandle {
        StopHandle {
            tx: self.tx.clone(),
        }
    }

    fn send(&self, request: ControlRequest) {
        // The loop may already be gone (stopped or failed); nothing to deliver to.
        if self.tx.send(request).is_err() {
            debug!("control loop no longer running, request dropped");
        }
    }
}

/// Stop-only handle, e.g. for a signal handler
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<ControlRequest>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        let _ = self.tx.send(ControlRequest::Stop);
    }
}

/// Requests accumulated since the control loop last acted on them
///
/// Later requests of the same kind replace earlier ones; a stop is sticky.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingControl {
    tags: Option<TagSet>,
    rotation: Option<PathBuf>,
    stop: bool,
}

impl PendingControl {
    fn apply(&mut self, request: ControlRequest) {
        match request {
            ControlRequest::Retag(tags) => self.tags = Some(tags),
            ControlRequest::Rotate(path) => self.rotation = Some(path),
            ControlRequest::Stop => self.stop = true,
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop
    }

    pub fn take_rotation(&mut self) -> Option<PathBuf> {
        self.rotation.take()
    }

    pub fn take_tags(&mut self) -> Option<TagSet> {
        self.tags.take()
    }
}

/// Control-loop side of the channel
pub struct ControlInbox {
    rx: Receiver<ControlRequest>,
    initial_tags: TagSet,
    pending: PendingControl,
}

impl ControlInbox {
    /// Filter the first connection is opened with
    pub fn initial_tags(&self) -> &TagSet {
        &self.initial_tags
    }

    /// Drain every queued request without blocking
    ///
    /// A disconnected command side counts as a stop request.
    pub fn poll(&mut self) -> &mut PendingControl {
        loop {
            match self.rx.try_recv() {
                Ok(request) => self.pending.apply(request),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.pending.stop = true;
                    break;
                }
            }
        }
        &mut self.pending
    }

    /// Block for up to `timeout`, returning early only if a stop arrives
    ///
    /// Other requests received meanwhile are queued for the next checkpoint.
    pub fn wait(&mut self, timeout: Duration) -> &mut PendingControl {
        let deadline = Instant::now() + timeout;
        while !self.pending.stop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(request) => self.pending.apply(request),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => self.pending.stop = true,
            }
        }
        self.poll()
    }
}
