//! Capture journal: durable record of every packet seen on the wire.
//!
//! Frames are `len:u32 LE | crc32:u32 LE | bincode(CaptureFrame)`. A journal
//! starts with one [`CaptureFrame::Header`] followed by one
//! [`CaptureFrame::Packet`] per received record, duplicates included, in
//! arrival order. The replay server can serve a journal back.
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};
use crate::packet::Packet;

pub const CAPTURE_VERSION: u16 = 1;

/// Largest payload a reader accepts; real frames are a few dozen bytes.
pub const MAX_FRAME_LEN: usize = 1 << 20;

pub fn now_unix_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Which request produced a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Bulk,
    Repair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureHeader {
    pub version: u16,
    pub created_unix_ns: u128,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub phase: Phase,
    pub recv_unix_ns: u128,
    pub packet: Packet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureFrame {
    Header(CaptureHeader),
    Packet(PacketRecord),
}

fn corrupt(msg: impl Into<String>) -> FeedError {
    FeedError::Capture(msg.into())
}

pub struct CaptureWriter<W: Write> {
    w: W,
}

impl CaptureWriter<BufWriter<File>> {
    /// Create (or truncate) a journal file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        Ok(Self::new(BufWriter::with_capacity(1 << 16, file)))
    }
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(w: W) -> Self { Self { w } }

    pub fn write_frame(&mut self, frame: &CaptureFrame) -> Result<()> {
        let payload = bincode::serialize(frame).map_err(|e| corrupt(format!("encode: {e}")))?;
        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let len = payload.len() as u32;
        self.w.write_all(&len.to_le_bytes())?;
        self.w.write_all(&crc.to_le_bytes())?;
        self.w.write_all(&payload)?;
        Ok(())
    }

    /// Write a header and all `records` in order, then flush.
    pub fn write_run(&mut self, header: CaptureHeader, records: &[PacketRecord]) -> Result<()> {
        self.write_frame(&CaptureFrame::Header(header))?;
        for r in records {
            self.write_frame(&CaptureFrame::Packet(r.clone()))?;
        }
        self.finish()
    }

    pub fn finish(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W { self.w }
}

/// Iterates the frames of a journal, verifying each CRC.
pub struct CaptureReader<R: Read> {
    r: R,
    frames: usize,
}

impl CaptureReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> CaptureReader<R> {
    pub fn new(r: R) -> Self { Self { r, frames: 0 } }

    fn read_u32(&mut self) -> std::io::Result<u32> {
        let mut buf = [0u8; 4];
        self.r.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Next frame, or `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<CaptureFrame>> {
        let len = match self.read_u32() {
            Ok(v) => v as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let frame_no = self.frames;
        if len > MAX_FRAME_LEN {
            return Err(corrupt(format!("frame {frame_no} length {len} exceeds {MAX_FRAME_LEN}")));
        }
        let truncated = |_| corrupt(format!("frame {frame_no} truncated"));
        let crc_on_file = self.read_u32().map_err(truncated)?;
        let mut payload = vec![0u8; len];
        self.r.read_exact(&mut payload).map_err(truncated)?;

        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let crc_calc = hasher.finalize();
        if crc_calc != crc_on_file {
            return Err(corrupt(format!("CRC mismatch at frame {frame_no}: file={crc_on_file:#x}, calc={crc_calc:#x}")));
        }
        let frame = bincode::deserialize(&payload).map_err(|e| corrupt(format!("decode frame {frame_no}: {e}")))?;
        self.frames += 1;
        Ok(Some(frame))
    }

    /// Read the whole journal: its header and the packet records in order.
    pub fn read_run(mut self) -> Result<(CaptureHeader, Vec<PacketRecord>)> {
        let header = match self.next_frame()? {
            Some(CaptureFrame::Header(h)) => h,
            Some(CaptureFrame::Packet(_)) => return Err(corrupt("journal does not start with a header")),
            None => return Err(corrupt("empty journal")),
        };
        if header.version != CAPTURE_VERSION {
            return Err(corrupt(format!("unsupported journal version {}", header.version)));
        }
        let mut records = Vec::new();
        while let Some(frame) = self.next_frame()? {
            match frame {
                CaptureFrame::Packet(r) => records.push(r),
                CaptureFrame::Header(_) => return Err(corrupt(format!("unexpected header at frame {}", self.frames - 1))),
            }
        }
        Ok((header, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> CaptureHeader {
        CaptureHeader { version: CAPTURE_VERSION, created_unix_ns: 1, server: "127.0.0.1:3000".into() }
    }

    fn record(phase: Phase, seq: i32) -> PacketRecord {
        PacketRecord { phase, recv_unix_ns: 10 + seq as u128, packet: Packet::new("AAPL", 'B', 1, 2, seq) }
    }

    #[test]
    fn journal_reads_back_in_order() {
        let records = vec![record(Phase::Bulk, 1), record(Phase::Bulk, 1), record(Phase::Repair, 2)];
        let mut w = CaptureWriter::new(Vec::new());
        w.write_run(header(), &records).unwrap();

        let (h, back) = CaptureReader::new(Cursor::new(w.into_inner())).read_run().unwrap();
        assert_eq!(h, header());
        assert_eq!(back, records);
    }

    #[test]
    fn crc_mismatch_detected() {
        let mut w = CaptureWriter::new(Vec::new());
        w.write_frame(&CaptureFrame::Header(header())).unwrap();
        let mut bytes = w.into_inner();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let err = CaptureReader::new(Cursor::new(bytes)).next_frame().unwrap_err();
        assert!(err.to_string().contains("CRC mismatch at frame 0"), "{err}");
    }

    #[test]
    fn truncated_frame_is_an_error_not_eof() {
        let mut w = CaptureWriter::new(Vec::new());
        w.write_frame(&CaptureFrame::Header(header())).unwrap();
        let mut bytes = w.into_inner();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(CaptureReader::new(Cursor::new(bytes)).next_frame(), Err(FeedError::Capture(_))));
    }

    #[test]
    fn oversized_length_is_rejected_before_allocating() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let err = CaptureReader::new(Cursor::new(bytes)).next_frame().unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
    }

    #[test]
    fn journal_must_start_with_header() {
        let mut w = CaptureWriter::new(Vec::new());
        w.write_frame(&CaptureFrame::Packet(record(Phase::Bulk, 1))).unwrap();
        assert!(CaptureReader::new(Cursor::new(w.into_inner())).read_run().is_err());
    }
}
