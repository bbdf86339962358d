//! Request framing and record decoding.
//!
//! Requests are two bytes: a call type followed by one payload byte. Call type
//! `1` asks for the whole stream (the payload byte is ignored by the server),
//! call type `2` asks for one record by sequence number. Responses carry no
//! length or count; every record is exactly [`PACKET_LEN`] bytes.
use std::io::{self, ErrorKind, Read};

use log::trace;

use crate::error::{FeedError, Result};
use crate::packet::{PACKET_LEN, Packet};

pub const CALL_STREAM_ALL: u8 = 1;
pub const CALL_RESEND: u8 = 2;

/// Width of the sequence field in a resend request.
///
/// The bulk stream carries 32-bit sequences but the deployed resend request
/// only has room for one byte. `Wide` sends the full value as `i32` big-endian
/// and must only be used against servers that understand it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResendWidth {
    #[default]
    Narrow,
    Wide,
}

impl ResendWidth {
    /// Whether `sequence` survives encoding without truncation.
    pub fn represents(self, sequence: i32) -> bool {
        match self {
            ResendWidth::Narrow => (0..=u8::MAX as i32).contains(&sequence),
            ResendWidth::Wide => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    StreamAll,
    ResendOne { sequence: i32 },
}

pub fn encode_stream_all() -> [u8; 2] {
    [CALL_STREAM_ALL, 0]
}

pub fn encode_resend(sequence: u8) -> [u8; 2] {
    [CALL_RESEND, sequence]
}

impl Request {
    pub fn encode(&self, width: ResendWidth) -> Vec<u8> {
        match (*self, width) {
            (Request::StreamAll, _) => encode_stream_all().to_vec(),
            // truncation is the wire format's limit, callers warn about it
            (Request::ResendOne { sequence }, ResendWidth::Narrow) => encode_resend(sequence as u8).to_vec(),
            (Request::ResendOne { sequence }, ResendWidth::Wide) => {
                let mut buf = Vec::with_capacity(5);
                buf.push(CALL_RESEND);
                buf.extend_from_slice(&sequence.to_be_bytes());
                buf
            }
        }
    }

    /// Read one request frame, as a server would.
    pub fn read_from<R: Read>(r: &mut R, width: ResendWidth) -> Result<Self> {
        let mut head = [0u8; 2];
        r.read_exact(&mut head)?;
        match (head[0], width) {
            (CALL_STREAM_ALL, _) => Ok(Request::StreamAll),
            (CALL_RESEND, ResendWidth::Narrow) => Ok(Request::ResendOne { sequence: head[1] as i32 }),
            (CALL_RESEND, ResendWidth::Wide) => {
                let mut rest = [0u8; 3];
                r.read_exact(&mut rest)?;
                let sequence = i32::from_be_bytes([head[1], rest[0], rest[1], rest[2]]);
                Ok(Request::ResendOne { sequence })
            }
            (other, _) => Err(io::Error::new(ErrorKind::InvalidData, format!("unknown call type {other}")).into()),
        }
    }
}

/// Outcome of trying to pull one record off a stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Record(Packet),
    /// Peer closed the stream on a record boundary.
    Eof,
    /// Read timed out before the first byte of a record.
    Idle,
}

/// Read one record. A timeout before the first byte is reported as
/// [`Frame::Idle`] when `idle_ends_burst` is set and as an i/o error otherwise;
/// a close or timeout after the first byte is always a short read.
pub(crate) fn next_frame<R: Read>(r: &mut R, idle_ends_burst: bool) -> Result<Frame> {
    let mut buf = [0u8; PACKET_LEN];
    let mut got = 0usize;
    while got < PACKET_LEN {
        match r.read(&mut buf[got..]) {
            Ok(0) if got == 0 => return Ok(Frame::Eof),
            Ok(0) => return Err(FeedError::ShortRead { got }),
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if got > 0 { return Err(FeedError::ShortRead { got }); }
                if idle_ends_burst { return Ok(Frame::Idle); }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }
    let packet = Packet::from_wire(&buf);
    trace!("decoded packet seq={} symbol={:?}", packet.sequence, packet.symbol);
    Ok(Frame::Record(packet))
}

/// Decode exactly one record; any end of stream is a short read here.
pub fn decode_packet<R: Read>(r: &mut R) -> Result<Packet> {
    match next_frame(r, false)? {
        Frame::Record(p) => Ok(p),
        Frame::Eof | Frame::Idle => Err(FeedError::ShortRead { got: 0 }),
    }
}
