//! Streamcrawl
//!
//! Consumes a tag-filtered stream of JSON events and writes them as
//! gzip-compressed JSON lines, while an operator adjusts the filter, rotates
//! the output file and inspects statistics from a console.
//!
//! # Features
//!
//! - **Live filter changes**: tags are applied at the next reconnect
//! - **Lossless rotation**: every event lands in exactly one output file
//! - **Resilient**: connection errors are retried after a fixed backoff
//! - **Responsive**: idle ticks let the loop notice requests on a quiet stream
//!
//! # Modules
//!
//! - `types`: Event and tag set
//! - `config`: JSON configuration, retry policy, credentials
//! - `stats`: Throughput counters
//! - `control`: Operator requests sent to the control loop
//! - `stream`: Stream source abstraction and the TCP line protocol
//! - `record`: Event to record encoding
//! - `sink`: Gzip output files
//! - `writer`: The control loop
//! - `command`: Operator console
//!
//! # Example
//!
//! ```no_run
//! use std::io;
//! use std::path::PathBuf;
//! use streamcrawl::{control, CommandInterpreter, CrawlConfig, GzipSinkFactory, SinkFactory};
//! use streamcrawl::{StreamWriter, TcpSource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlConfig::load("crawl.json")?;
//!     let output = PathBuf::from("events.jsonl.gz");
//!
//!     let mut sinks = GzipSinkFactory::new(config.output.compression_level);
//!     let sink = sinks.create_new(&output)?;
//!     let (handle, inbox) = control::channel(config.tag_set(), output);
//!     let source = TcpSource::new(&config.source, config.credentials());
//!
//!     let writer = StreamWriter::new(Box::new(source), Box::new(sinks), sink, inbox)
//!         .with_retry(config.retry.clone());
//!     let (stats, status) = (writer.stats(), writer.status());
//!     let thread = writer.spawn()?;
//!
//!     let stdin = io::stdin();
//!     CommandInterpreter::new(stdin.lock(), io::stdout(), handle, stats, status).run()?;
//!     let summary = thread.join()?;
//!     println!("{} events written", summary.events);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod control;
pub mod record;
pub mod sink;
pub mod stats;
pub mod stream;
pub mod types;
pub mod writer;

// Re-export commonly used items at crate root
pub use command::{Command, CommandInterpreter};
pub use config::{ConfigError, CrawlConfig, Credentials, RetryPolicy, SourceConfig};
pub use control::{ControlError, ControlHandle, ControlInbox, ControlRequest, StopHandle};
pub use record::{JsonLineEncoder, RecordEncoder};
pub use sink::{GzipSinkFactory, Sink, SinkError, SinkFactory};
pub use stats::{StatsSummary, StatsTracker};
pub use stream::{Connection, ConnectionError, Delivery, StreamSource, TcpSource};
pub use types::{Event, TagSet};
pub use writer::{Phase, RunSummary, StreamError, StreamWriter, WriterStatus, WriterThread};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name
pub const NAME: &str = env!("CARGO_PKG_NAME");
