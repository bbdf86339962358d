//! Connection factory used by the orchestrator.
//!
//! Every request gets its own connection; the stream is dropped (and the
//! socket closed) when the request scope ends.
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::error::{FeedError, Result};

pub trait Connector {
    type Stream: Read + Write;

    /// Open a fresh connection for a single request. `read_timeout` bounds
    /// each read on the returned stream; `None` blocks until data or close.
    fn connect(&mut self, read_timeout: Option<Duration>) -> Result<Self::Stream>;

    /// Peer description for logs and error context.
    fn peer(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), connect_timeout: None }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn fail(&self, source: io::Error) -> FeedError {
        FeedError::Connection { addr: self.addr.clone(), source }
    }

    /// Try every resolved address in turn, keeping the last failure.
    fn connect_each(&self, timeout: Duration) -> Result<TcpStream> {
        let mut last = None;
        for addr in self.addr.to_socket_addrs().map_err(|e| self.fail(e))? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => { debug!("connect to {addr} failed: {e}"); last = Some(e); }
            }
        }
        Err(self.fail(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing"))))
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self, read_timeout: Option<Duration>) -> Result<TcpStream> {
        let stream = match self.connect_timeout {
            Some(t) => self.connect_each(t)?,
            None => TcpStream::connect(self.addr.as_str()).map_err(|e| self.fail(e))?,
        };
        stream.set_read_timeout(read_timeout).map_err(|e| self.fail(e))?;
        stream.set_nodelay(true).map_err(|e| self.fail(e))?;
        debug!("connected to {} from {:?}", self.addr, stream.local_addr().ok());
        Ok(stream)
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}
