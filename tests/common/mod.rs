//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;

use streamcrawl::sink::SinkResult;
use streamcrawl::{
    Connection, ConnectionError, Delivery, Event, Sink, SinkFactory, StreamSource, TagSet,
};

/// How long a scripted connection waits for input before reporting idle
pub const TICK: Duration = Duration::from_millis(10);

/// Generous upper bound for anything the tests wait on
pub const PATIENCE: Duration = Duration::from_secs(10);

pub fn tags(items: &[&str]) -> TagSet {
    items.iter().map(|t| t.to_string()).collect()
}

pub fn numbered(n: u64) -> Event {
    Event::new(json!({ "n": n, "text": format!("event {}", n) }))
}

/// Poll `condition` until it holds or [`PATIENCE`] runs out
pub fn wait_until<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ============================================================================
// Sources
// ============================================================================

/// Input for a [`FeedSource`] connection
pub enum Feed {
    Event(Event),
    /// Fail the live connection
    Drop,
}

/// Source whose connections all read from one test-controlled feed
///
/// Every `connect` records the tag set it was asked for.
pub struct FeedSource {
    feed: Arc<Mutex<Receiver<Feed>>>,
    connects: Arc<Mutex<Vec<TagSet>>>,
}

/// Test side of a [`FeedSource`]
#[derive(Clone)]
pub struct FeedControl {
    tx: Sender<Feed>,
    connects: Arc<Mutex<Vec<TagSet>>>,
}

impl FeedSource {
    pub fn new() -> (Self, FeedControl) {
        let (tx, rx) = mpsc::channel();
        let connects = Arc::new(Mutex::new(Vec::new()));
        let source = FeedSource {
            feed: Arc::new(Mutex::new(rx)),
            connects: Arc::clone(&connects),
        };
        (source, FeedControl { tx, connects })
    }
}

impl FeedControl {
    pub fn send(&self, event: Event) {
        self.tx.send(Feed::Event(event)).unwrap();
    }

    pub fn drop_connection(&self) {
        self.tx.send(Feed::Drop).unwrap();
    }

    /// Tag sets of every connection attempt so far
    pub fn connects(&self) -> Vec<TagSet> {
        self.connects.lock().unwrap().clone()
    }
}

impl StreamSource for FeedSource {
    fn connect(&mut self, tags: &TagSet) -> Result<Box<dyn Connection>, ConnectionError> {
        self.connects.lock().unwrap().push(tags.clone());
        Ok(Box::new(FeedConnection {
            feed: Arc::clone(&self.feed),
        }))
    }
}

struct FeedConnection {
    feed: Arc<Mutex<Receiver<Feed>>>,
}

impl Connection for FeedConnection {
    fn next_delivery(&mut self) -> Result<Delivery, ConnectionError> {
        let received = self.feed.lock().unwrap().recv_timeout(TICK);
        match received {
            Ok(Feed::Event(event)) => Ok(Delivery::Event(event)),
            Ok(Feed::Drop) => Err(ConnectionError::Closed),
            Err(RecvTimeoutError::Timeout) => Ok(Delivery::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(TICK);
                Ok(Delivery::Idle)
            }
        }
    }
}

/// Source that never manages to connect
#[derive(Default)]
pub struct FailingSource {
    attempts: Arc<AtomicUsize>,
}

impl FailingSource {
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl StreamSource for FailingSource {
    fn connect(&mut self, _tags: &TagSet) -> Result<Box<dyn Connection>, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ConnectionError::Other("connection refused".to_string()))
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Everything written through a [`RecordingSinks`] factory
#[derive(Default)]
pub struct Recorded {
    /// Records per path, in append order
    pub files: Vec<(PathBuf, Vec<String>)>,
    /// Number of `close` calls
    pub closes: usize,
}

impl Recorded {
    pub fn records(&self, path: &Path) -> Vec<String> {
        self.files
            .iter()
            .filter(|(p, _)| p == path)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.files.iter().map(|(_, records)| records.len()).sum()
    }
}

/// In-memory sinks that remember what was written and closed
#[derive(Clone, Default)]
pub struct RecordingSinks {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingSinks {
    pub fn recorded(&self) -> Arc<Mutex<Recorded>> {
        Arc::clone(&self.recorded)
    }

    fn open(&self, path: &Path) -> Box<dyn Sink> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.files.push((path.to_path_buf(), Vec::new()));
        Box::new(RecordingSink {
            path: path.to_path_buf(),
            index: recorded.files.len() - 1,
            recorded: Arc::clone(&self.recorded),
        })
    }
}

impl SinkFactory for RecordingSinks {
    fn create_new(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>> {
        Ok(self.open(path))
    }

    fn open_append(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>> {
        Ok(self.open(path))
    }
}

struct RecordingSink {
    path: PathBuf,
    index: usize,
    recorded: Arc<Mutex<Recorded>>,
}

impl Sink for RecordingSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &[u8]) -> SinkResult<()> {
        let line = String::from_utf8_lossy(record).trim_end().to_string();
        self.recorded.lock().unwrap().files[self.index].1.push(line);
        Ok(())
    }

    fn close(self: Box<Self>) -> SinkResult<()> {
        self.recorded.lock().unwrap().closes += 1;
        Ok(())
    }
}

// ============================================================================
// Console plumbing
// ============================================================================

/// Blocking reader fed line by line from the test
pub struct LineFeed {
    rx: Receiver<String>,
    buffer: Vec<u8>,
}

impl LineFeed {
    /// Returns the reader and its sender; dropping the sender ends input
    pub fn new() -> (Self, Sender<String>) {
        let (tx, rx) = mpsc::channel();
        (
            LineFeed {
                rx,
                buffer: Vec::new(),
            },
            tx,
        )
    }
}

impl Read for LineFeed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer.is_empty() {
            match self.rx.recv() {
                Ok(line) => self.buffer = format!("{}\n", line).into_bytes(),
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.drain(..n);
        Ok(n)
    }
}

/// Writer whose contents the test can inspect while it is in use
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
