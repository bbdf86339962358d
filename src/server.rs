//! Sequential replay server speaking the feed protocol.
//!
//! Serves a fixed packet list: a stream-all request gets every packet that is
//! not withheld, back-to-back, then the connection is closed. A resend request
//! gets the one packet with that sequence (withheld or not), or an immediate
//! close when the sequence is unknown. One connection is handled at a time.
use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};

use log::{debug, info, warn};

use crate::codec::{Request, ResendWidth};
use crate::error::Result;
use crate::packet::Packet;

const SYMBOLS: [&str; 4] = ["MSFT", "AAPL", "AMZN", "META"];

/// `count` deterministic packets with sequences `1..=count`.
pub fn synthetic_packets(count: usize) -> Vec<Packet> {
    (1..=count as i32)
        .map(|seq| {
            let symbol = SYMBOLS[(seq as usize - 1) % SYMBOLS.len()];
            let side = if seq % 2 == 1 { 'B' } else { 'S' };
            Packet::new(symbol, side, 10 * seq, 1_000 + 5 * seq, seq)
        })
        .collect()
}

pub struct FeedServer {
    listener: TcpListener,
    packets: Vec<Packet>,
    withheld: HashSet<i32>,
    width: ResendWidth,
}

impl FeedServer {
    pub fn bind(addr: &str, packets: Vec<Packet>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, packets, withheld: HashSet::new(), width: ResendWidth::Narrow })
    }

    /// Leave these sequences out of the bulk stream.
    pub fn withhold(mut self, sequences: impl IntoIterator<Item = i32>) -> Self {
        self.withheld.extend(sequences);
        self
    }

    pub fn with_resend_width(mut self, width: ResendWidth) -> Self {
        self.width = width;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Answer a single request on `stream`.
    pub fn handle<S: Read + Write>(&self, stream: &mut S) -> Result<Request> {
        let request = Request::read_from(stream, self.width)?;
        match request {
            Request::StreamAll => {
                let mut sent = 0usize;
                for p in self.packets.iter().filter(|p| !self.withheld.contains(&p.sequence)) {
                    stream.write_all(&p.to_wire())?;
                    sent += 1;
                }
                debug!("streamed {sent} packets");
            }
            Request::ResendOne { sequence } => match self.packets.iter().find(|p| p.sequence == sequence) {
                Some(p) => stream.write_all(&p.to_wire())?,
                None => warn!("resend for unknown sequence {sequence}"),
            },
        }
        stream.flush()?;
        Ok(request)
    }

    /// Accept one connection, answer it and close it.
    pub fn serve_one(&self) -> Result<Request> {
        let (mut stream, peer) = self.listener.accept()?;
        debug!("accepted {peer}");
        self.handle(&mut stream)
    }

    /// Serve connections one after another. Failures on a single connection
    /// are logged and do not stop the loop.
    pub fn serve(&self, max_connections: Option<usize>) -> Result<()> {
        info!("serving {} packets ({} withheld) on {}", self.packets.len(), self.withheld.len(), self.local_addr()?);
        let mut served = 0usize;
        while max_connections.is_none_or(|max| served < max) {
            match self.serve_one() {
                Ok(request) => debug!("answered {request:?}"),
                Err(e) => warn!("connection failed: {e}"),
            }
            served += 1;
        }
        Ok(())
    }
}
