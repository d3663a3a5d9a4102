//! Newline-delimited JSON stream over TCP
//!
//! Protocol, one JSON document per line:
//!
//! ```text
//! client → {"track":["rust","tokio"],"user":"alice","password":"..."}
//! server → {"ok":true}                  (or {"ok":false,"error":"..."})
//! server → {...event...}
//! server → {...event...}
//! ```
//!
//! The socket carries a read timeout equal to the idle timeout, so a quiet
//! stream surfaces as [`Delivery::Idle`] instead of blocking forever.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{Connection, ConnectionError, Delivery, StreamSource};
use crate::config::{Credentials, SourceConfig};
use crate::types::{Event, TagSet};

#[derive(Serialize)]
struct Handshake<'a> {
    track: Vec<&'a str>,
    user: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct Acknowledgement {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Stream source speaking the line protocol above
#[derive(Debug, Clone)]
pub struct TcpSource {
    address: String,
    credentials: Credentials,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl TcpSource {
    pub fn new(config: &SourceConfig, credentials: Credentials) -> Self {
        Self {
            address: config.address.clone(),
            credentials,
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open_stream(&self) -> Result<TcpStream, ConnectionError> {
        let connect_error = |source| ConnectionError::Connect {
            address: self.address.clone(),
            source,
        };

        let mut last_error = None;
        for addr in self.address.to_socket_addrs().map_err(connect_error)? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(connect_error(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to no socket")
        })))
    }

    fn handshake(&self, stream: &TcpStream, tags: &TagSet) -> Result<(), ConnectionError> {
        let request = Handshake {
            track: tags.iter().map(String::as_str).collect(),
            user: self.credentials.user(),
            password: self.credentials.password(),
        };
        let mut line =
            serde_json::to_vec(&request).map_err(|e| ConnectionError::Other(e.to_string()))?;
        line.push(b'\n');

        let mut writer = stream;
        writer.write_all(&line).map_err(ConnectionError::Io)?;
        writer.flush().map_err(ConnectionError::Io)
    }
}

impl StreamSource for TcpSource {
    fn connect(&mut self, tags: &TagSet) -> Result<Box<dyn Connection>, ConnectionError> {
        let stream = self.open_stream()?;
        stream
            .set_read_timeout(Some(self.connect_timeout))
            .map_err(ConnectionError::Io)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on {}: {}", self.address, e);
        }

        self.handshake(&stream, tags)?;

        let mut reader = BufReader::new(stream);
        let mut ack_line = Vec::new();
        if reader.read_until(b'\n', &mut ack_line).map_err(ConnectionError::Io)? == 0 {
            return Err(ConnectionError::Closed);
        }

        let ack: Acknowledgement = serde_json::from_slice(trim_line(&ack_line))
            .map_err(|e| ConnectionError::Rejected(format!("malformed acknowledgement: {}", e)))?;
        if !ack.ok {
            return Err(ConnectionError::Rejected(
                ack.error.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }

        reader
            .get_ref()
            .set_read_timeout(Some(self.idle_timeout))
            .map_err(ConnectionError::Io)?;
        debug!("Connected to {}", self.address);

        Ok(Box::new(TcpConnection {
            reader,
            pending: Vec::new(),
        }))
    }
}

/// Live connection; keeps partial lines across read timeouts
struct TcpConnection {
    reader: BufReader<TcpStream>,
    pending: Vec<u8>,
}

impl Connection for TcpConnection {
    fn next_delivery(&mut self) -> Result<Delivery, ConnectionError> {
        loop {
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => return Err(ConnectionError::Closed),
                Ok(_) if !self.pending.ends_with(b"\n") => return Err(ConnectionError::Closed),
                Ok(_) => {
                    let line = std::mem::take(&mut self.pending);
                    let line = trim_line(&line);
                    if line.is_empty() {
                        continue;
                    }
                    match Event::from_slice(line) {
                        Ok(event) => return Ok(Delivery::Event(event)),
                        Err(e) => warn!("Skipping malformed event: {}", e),
                    }
                }
                Err(e) if is_timeout(&e) => return Ok(Delivery::Idle),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ConnectionError::Io(e)),
            }
        }
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &line[start..end]
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
