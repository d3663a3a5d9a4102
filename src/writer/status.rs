//! Observable state of the control loop

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::types::TagSet;

/// Where the control loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Streaming,
    ReconnectWait,
    Rotating,
    Stopped,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::Streaming => "streaming",
            Phase::ReconnectWait => "reconnect-wait",
            Phase::Rotating => "rotating",
            Phase::Stopped => "stopped",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
struct StatusInner {
    phase: Phase,
    active_tags: Option<TagSet>,
    output: PathBuf,
    last_error: Option<String>,
}

/// Status published by the control loop for the operator
///
/// Only the control loop writes; readers get copies.
#[derive(Debug)]
pub struct WriterStatus {
    inner: RwLock<StatusInner>,
}

impl WriterStatus {
    pub fn new(output: PathBuf) -> Self {
        Self {
            inner: RwLock::new(StatusInner {
                phase: Phase::Connecting,
                active_tags: None,
                output,
                last_error: None,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.read().phase
    }

    /// Filter of the live connection, if one is open
    pub fn active_tags(&self) -> Option<TagSet> {
        self.inner.read().active_tags.clone()
    }

    /// Path of the sink currently receiving records
    pub fn output(&self) -> PathBuf {
        self.inner.read().output.clone()
    }

    /// Message of the error that ended the loop
    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.inner.write().phase = phase;
    }

    pub(crate) fn connected(&self, tags: &TagSet) {
        let mut inner = self.inner.write();
        inner.phase = Phase::Streaming;
        inner.active_tags = Some(tags.clone());
    }

    pub(crate) fn disconnected(&self, phase: Phase) {
        let mut inner = self.inner.write();
        inner.phase = phase;
        inner.active_tags = None;
    }

    pub(crate) fn set_output(&self, output: &Path) {
        self.inner.write().output = output.to_path_buf();
    }

    pub(crate) fn failed(&self, message: String) {
        let mut inner = self.inner.write();
        inner.phase = Phase::Failed;
        inner.active_tags = None;
        inner.last_error = Some(message);
    }
}
