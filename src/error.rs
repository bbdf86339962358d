//! Error taxonomy for the feed client.
//!
//! Everything except [`FeedError::DuplicateSequence`] is fatal to a run.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::packet::PACKET_LEN;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Connecting to the feed server failed, or the connection broke while a
    /// request was being written.
    #[error("connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The peer stopped sending in the middle of a record.
    #[error("short read: stream ended after {got} of {} record bytes", PACKET_LEN)]
    ShortRead { got: usize },

    /// Gap analysis needs at least one received sequence.
    #[error("gap analysis requires at least one received packet")]
    EmptyInput,

    /// A repaired packet carried a sequence that was already collected.
    #[error("sequence {sequence} already present, record discarded")]
    DuplicateSequence { sequence: i32 },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The output sink could not persist the assembled records.
    #[error("writing output to {path:?} failed: {reason}")]
    Output { path: PathBuf, reason: String },

    /// A capture journal could not be written, parsed or verified.
    #[error("capture journal: {0}")]
    Capture(String),
}

impl FeedError {
    /// Only duplicate repairs are tolerated; everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FeedError::DuplicateSequence { .. })
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
