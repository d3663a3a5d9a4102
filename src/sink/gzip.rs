//! gzip-backed sink

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;

use super::{Sink, SinkError, SinkFactory, SinkResult};

/// Buffer between the encoder and the file
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Opens gzip sinks at a fixed compression level
#[derive(Debug, Clone, Copy)]
pub struct GzipSinkFactory {
    level: Compression,
}

impl GzipSinkFactory {
    /// `level` is clamped to the gzip range 0-9
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    fn open_with(&self, path: &Path, options: &OpenOptions) -> SinkResult<Box<dyn Sink>> {
        let file = options.open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                SinkError::AlreadyExists(path.to_path_buf())
            } else {
                SinkError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        debug!("Opened output {}", path.display());
        Ok(Box::new(GzipSink {
            path: path.to_path_buf(),
            encoder: GzEncoder::new(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file), self.level),
            records: 0,
        }))
    }
}

impl Default for GzipSinkFactory {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl SinkFactory for GzipSinkFactory {
    fn create_new(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        self.open_with(path, &options)
    }

    fn open_append(&mut self, path: &Path) -> SinkResult<Box<dyn Sink>> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        self.open_with(path, &options)
    }
}

/// One gzip member being written to a file
pub struct GzipSink {
    path: PathBuf,
    encoder: GzEncoder<BufWriter<File>>,
    records: u64,
}

impl GzipSink {
    fn finish(self) -> io::Result<()> {
        let buffered = self.encoder.finish()?;
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl Sink for GzipSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, record: &[u8]) -> SinkResult<()> {
        self.encoder
            .write_all(record)
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.records += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> SinkResult<()> {
        let path = self.path.clone();
        let records = self.records;
        self.finish()
            .map_err(|source| SinkError::Close { path: path.clone(), source })?;
        debug!("Closed output {} after {} records", path.display(), records);
        Ok(())
    }
}

/// Read every record line back from a (possibly multi-member) gzip file
pub fn read_records<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(MultiGzDecoder::new(file));
    reader
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.is_empty()))
        .collect()
}
