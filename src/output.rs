//! Output assembly and sinks.
//!
//! [`assemble`] fixes the final ordering; a [`PacketSink`] decides where the
//! ordered records go. [`JsonFileSink`] writes a pretty-printed JSON array and
//! only replaces the destination once the whole document is on disk.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{FeedError, Result};
use crate::packet::Packet;

/// Copy of `packets` sorted by sequence; equal sequences keep their order.
pub fn assemble(packets: &[Packet]) -> Vec<Packet> {
    let mut out = packets.to_vec();
    out.sort_by_key(|p| p.sequence);
    out
}

pub trait PacketSink {
    fn emit(&mut self, packets: &[Packet]) -> Result<()>;
}

/// Collects emitted records in memory.
impl PacketSink for Vec<Packet> {
    fn emit(&mut self, packets: &[Packet]) -> Result<()> {
        self.extend_from_slice(packets);
        Ok(())
    }
}

/// Writes the records as a JSON array to any writer.
pub struct JsonSink<W: Write> {
    w: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(w: W) -> Self { Self { w } }

    pub fn into_inner(self) -> W { self.w }
}

impl<W: Write> PacketSink for JsonSink<W> {
    fn emit(&mut self, packets: &[Packet]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.w, packets).map_err(|e| FeedError::Output { path: PathBuf::from("<writer>"), reason: e.to_string() })?;
        self.w.flush()?;
        Ok(())
    }
}

/// Writes `path` through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn write_tmp(&self, tmp: &Path, packets: &[Packet]) -> std::result::Result<(), String> {
        let file = File::create(tmp).map_err(|e| e.to_string())?;
        let mut sink = JsonSink::new(BufWriter::new(file));
        sink.emit(packets).map_err(|e| e.to_string())?;
        let file = sink.into_inner().into_inner().map_err(|e| e.to_string())?;
        file.sync_all().map_err(|e| e.to_string())
    }
}

impl PacketSink for JsonFileSink {
    fn emit(&mut self, packets: &[Packet]) -> Result<()> {
        let fail = |reason: String| FeedError::Output { path: self.path.clone(), reason };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(reason) = self.write_tmp(&tmp, packets) {
            let _ = fs::remove_file(&tmp);
            return Err(fail(reason));
        }
        fs::rename(&tmp, &self.path).map_err(|e| fail(e.to_string()))?;
        info!("wrote {} packets to {}", packets.len(), self.path.display());
        Ok(())
    }
}
