//! Gap-recovering client for a length-implicit binary trade feed.
//!
//! The client asks the server for its whole stream of fixed-size trade
//! packets, works out which sequence numbers never arrived, fetches each of
//! those on its own connection and hands the merged, ordered result to a sink.
//!
//! - `packet`: the 17-byte trade record and its wire layout
//! - `codec`: request frames and record decoding
//! - `reader`: record-at-a-time burst and single-record readers
//! - `gaps`: missing sequence detection
//! - `recovery`: the bulk + repair orchestrator
//! - `client`: one configured run, journal first, then the output file
//! - `output`: ordering and JSON sinks
//! - `capture`: CRC-framed journal of received packets
//! - `server`: sequential replay server used by `feed_server` and the tests
pub mod capture;
pub mod client;
pub mod codec;
pub mod config;
pub mod connect;
pub mod error;
pub mod gaps;
pub mod output;
pub mod packet;
pub mod reader;
pub mod recovery;
pub mod server;

pub use error::{FeedError, Result};
pub use packet::{PACKET_LEN, Packet};
