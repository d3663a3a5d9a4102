//! Compressed append-only output
//!
//! - `Sink`: one open output file receiving records
//! - `SinkFactory`: opens sinks, either a fresh initial output or a rotation
//!   target
//! - `GzipSinkFactory`: gzip implementation; rotated files that already exist
//!   get a new gzip member appended, which multi-member decoders read through

mod gzip;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use gzip::{read_records, GzipSink, GzipSinkFactory};

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Output failures; all of them are fatal to the control loop
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output path {} already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to open output {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to finalize output {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An open output receiving encoded records
pub trait Sink: Send {
    /// Path the records are written to
    fn path(&self) -> &Path;

    /// Append one encoded record
    fn append(&mut self, record: &[u8]) -> SinkResult<()>;

    /// Flush, finalize and durably persist everything appended
    fn close(self: Box<Self>) -> SinkResult<()>;
}

/// Opens sinks for the control loop
pub trait SinkFactory: Send {
    /// Open the initial output; fails if `path` already exists
    fn create_new(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>>;

    /// Open a rotation target, keeping whatever the file already holds
    fn open_append(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>>;
}
