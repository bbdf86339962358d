//! Two-phase retrieval: one bulk burst, then one resend per gap.
//!
//! The orchestrator owns the packet collection for the whole run. Each
//! request runs on its own connection, which is dropped before the next
//! request is issued. There is no retry: the first transport or decode
//! failure ends the run, and nothing reaches the sink.
use std::collections::HashSet;
use std::io::Write;

use log::{debug, info, warn};

use crate::capture::{PacketRecord, Phase, now_unix_ns};
use crate::codec::{Request, ResendWidth};
use crate::connect::Connector;
use crate::error::{FeedError, Result};
use crate::gaps::find_missing;
use crate::output::{PacketSink, assemble};
use crate::packet::Packet;
use crate::reader::{BurstEnd, read_all, read_one};

/// Packets keyed by sequence, kept in insertion order.
#[derive(Debug, Default, Clone)]
pub struct PacketSet {
    packets: Vec<Packet>,
    seen: HashSet<i32>,
}

impl PacketSet {
    /// Insert unless the sequence is already present. Returns whether the
    /// packet was added.
    pub fn insert(&mut self, packet: Packet) -> bool {
        if !self.seen.insert(packet.sequence) { return false; }
        self.packets.push(packet);
        true
    }

    pub fn contains(&self, sequence: i32) -> bool { self.seen.contains(&sequence) }

    pub fn len(&self) -> usize { self.packets.len() }

    pub fn is_empty(&self) -> bool { self.packets.is_empty() }

    pub fn as_slice(&self) -> &[Packet] { &self.packets }

    pub fn sequences(&self) -> impl Iterator<Item = i32> + '_ {
        self.packets.iter().map(|p| p.sequence)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryOptions {
    pub burst_end: BurstEnd,
    pub resend_width: ResendWidth,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records read in the bulk burst, duplicates included.
    pub received: usize,
    /// Gaps found after the bulk burst.
    pub missing: Vec<i32>,
    /// Resend responses that were added to the collection.
    pub repaired: usize,
    /// Records discarded because their sequence was already present.
    pub duplicates: usize,
    /// Resend responses carrying a different sequence than requested.
    pub mismatched: usize,
    /// Records handed to the sink.
    pub emitted: usize,
}

#[derive(Debug, Clone)]
pub struct Collected {
    pub packets: PacketSet,
    /// Everything read off the wire, in arrival order.
    pub wire: Vec<PacketRecord>,
    pub report: RecoveryReport,
}

pub struct Recovery<C: Connector> {
    connector: C,
    options: RecoveryOptions,
}

impl<C: Connector> Recovery<C> {
    pub fn new(connector: C, options: RecoveryOptions) -> Self {
        Self { connector, options }
    }

    fn send(&self, stream: &mut C::Stream, request: Request) -> Result<()> {
        let bytes = request.encode(self.options.resend_width);
        let fail = |source| FeedError::Connection { addr: self.connector.peer(), source };
        stream.write_all(&bytes).map_err(fail)?;
        stream.flush().map_err(fail)
    }

    /// Bulk phase on a single connection. Only this stream carries the idle
    /// read timeout.
    pub fn request_all(&mut self) -> Result<Vec<Packet>> {
        let mut stream = self.connector.connect(self.options.burst_end.idle)?;
        self.send(&mut stream, Request::StreamAll)?;
        info!("stream-all request sent to {}", self.connector.peer());
        read_all(&mut stream, self.options.burst_end)
    }

    /// One resend on a fresh connection, read without a timeout.
    pub fn request_one(&mut self, sequence: i32) -> Result<Packet> {
        if !self.options.resend_width.represents(sequence) {
            warn!("sequence {sequence} does not fit a one-byte resend request, sending {}", sequence as u8);
        }
        let mut stream = self.connector.connect(None)?;
        self.send(&mut stream, Request::ResendOne { sequence })?;
        debug!("resend request for {sequence} sent");
        read_one(&mut stream)
    }

    /// Bulk, analyze and repair phases.
    pub fn collect(&mut self) -> Result<Collected> {
        let mut report = RecoveryReport::default();
        let mut packets = PacketSet::default();
        let mut wire = Vec::new();

        let bulk = self.request_all()?;
        report.received = bulk.len();
        info!("initial packets received: {}", bulk.len());
        for p in bulk {
            wire.push(PacketRecord { phase: Phase::Bulk, recv_unix_ns: now_unix_ns(), packet: p.clone() });
            let sequence = p.sequence;
            if !packets.insert(p) {
                debug!("bulk burst repeated sequence {sequence}");
                report.duplicates += 1;
            }
        }

        report.missing = find_missing(packets.sequences())?;
        if report.missing.is_empty() {
            info!("no gaps in {} packets", packets.len());
        } else {
            info!("requesting {} missing packets: {:?}", report.missing.len(), report.missing);
        }

        for &sequence in &report.missing {
            let p = self.request_one(sequence)?;
            wire.push(PacketRecord { phase: Phase::Repair, recv_unix_ns: now_unix_ns(), packet: p.clone() });
            if p.sequence != sequence {
                warn!("requested sequence {sequence} but received {}", p.sequence);
                report.mismatched += 1;
            }
            let got = p.sequence;
            if packets.insert(p) {
                debug!("packet added: {got}");
                report.repaired += 1;
            } else {
                warn!("{}", FeedError::DuplicateSequence { sequence: got });
                report.duplicates += 1;
            }
        }

        Ok(Collected { packets, wire, report })
    }

    /// Full run: collect, order, and hand the result to `sink`.
    pub fn run<S: PacketSink>(&mut self, sink: &mut S) -> Result<Collected> {
        let mut collected = self.collect()?;
        deliver(&mut collected, sink)?;
        Ok(collected)
    }
}

/// Assemble phase: order the collection and hand it to `sink`.
pub fn deliver<S: PacketSink>(collected: &mut Collected, sink: &mut S) -> Result<()> {
    let ordered = assemble(collected.packets.as_slice());
    sink.emit(&ordered)?;
    collected.report.emitted = ordered.len();
    info!(
        "run complete: received={} missing={} repaired={} duplicates={} mismatched={} emitted={}",
        collected.report.received,
        collected.report.missing.len(),
        collected.report.repaired,
        collected.report.duplicates,
        collected.report.mismatched,
        collected.report.emitted
    );
    Ok(())
}
