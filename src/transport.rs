//! Request-reply transport used by action handlers.
//!
//! Each request is one JSON object on one line, answered by exactly one JSON
//! object on one line. A handler blocks until its reply arrives; whether that
//! wait is bounded is a configuration choice ([`ReplyWait`]).

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use serde_json::Value;

use crate::error::{TransportError, TransportResult};

/// A blocking request-reply channel to an external process simulator.
pub trait Transport {
    /// Send one request and block for its reply.
    fn request(&mut self, message: &Value) -> TransportResult<Value>;

    /// Close the channel. Calling it twice is harmless.
    fn disconnect(&mut self) -> TransportResult<()>;
}

/// How long a handler waits for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyWait {
    /// Block until the reply arrives, however long that takes.
    #[default]
    Forever,
    /// Give up after this long; the cycle then fails with [`TransportError::Timeout`].
    Bounded(Duration),
}

impl ReplyWait {
    fn read_timeout(self) -> Option<Duration> {
        match self {
            Self::Forever => None,
            Self::Bounded(d) => Some(d),
        }
    }
}

/// Newline-delimited JSON over TCP.
#[derive(Debug)]
pub struct TcpJsonTransport {
    peer: String,
    stream: Option<BufReader<TcpStream>>,
    wait: ReplyWait,
}

impl TcpJsonTransport {
    /// Connect to `address`.
    pub fn connect(address: &str, wait: ReplyWait) -> TransportResult<Self> {
        let stream = TcpStream::connect(address).map_err(|source| TransportError::Connect {
            address: address.to_string(),
            source,
        })?;
        tracing::info!(address, ?wait, "connected to process simulator");
        Self::from_stream(stream, wait)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: TcpStream, wait: ReplyWait) -> TransportResult<Self> {
        stream
            .set_read_timeout(wait.read_timeout())
            .map_err(TransportError::Io)?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".into());
        Ok(Self {
            peer,
            stream: Some(BufReader::new(stream)),
            wait,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Transport for TcpJsonTransport {
    fn request(&mut self, message: &Value) -> TransportResult<Value> {
        let wait = self.wait;
        let reader = self.stream.as_mut().ok_or(TransportError::Disconnected)?;

        let mut line = serde_json::to_string(message).map_err(|e| TransportError::Malformed {
            message: e.to_string(),
        })?;
        line.push('\n');
        let mut writer = reader.get_ref();
        writer.write_all(line.as_bytes()).map_err(TransportError::Io)?;
        writer.flush().map_err(TransportError::Io)?;

        let mut reply = String::new();
        match reader.read_line(&mut reply) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                let millis = match wait {
                    ReplyWait::Bounded(d) => d.as_millis(),
                    ReplyWait::Forever => 0,
                };
                return Err(TransportError::Timeout { millis });
            }
            Err(e) => return Err(TransportError::Io(e)),
        }

        serde_json::from_str(reply.trim_end()).map_err(|e| TransportError::Malformed {
            message: e.to_string(),
        })
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(reader) = self.stream.take() {
            tracing::info!(peer = %self.peer, "disconnecting from process simulator");
            match reader.get_ref().shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
        Ok(())
    }
}
