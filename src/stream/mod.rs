//! Stream source abstraction
//!
//! A source opens connections for a filter set. A connection yields
//! deliveries until it fails; it is never restarted, the control loop opens a
//! new one instead.

mod tcp;

use thiserror::Error;

use crate::types::{Event, TagSet};

pub use tcp::TcpSource;

/// Transient source failure; the control loop always recovers from these
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("handshake rejected: {0}")]
    Rejected(String),
    #[error("stream i/o failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("stream closed by remote")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// What a connection produced on one read
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// An event to persist
    Event(Event),
    /// Nothing arrived within the idle timeout; the connection is still alive
    Idle,
}

/// A live, non-restartable stream of deliveries
pub trait Connection: Send {
    /// Block until the next delivery or a terminating error
    fn next_delivery(&mut self) -> Result<Delivery, ConnectionError>;
}

/// Opens filtered connections to the remote stream
pub trait StreamSource: Send {
    fn connect(&mut self, tags: &TagSet) -> Result<Box<dyn Connection>, ConnectionError>;
}
