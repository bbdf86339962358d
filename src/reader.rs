//! Record-at-a-time readers over a blocking byte stream.
use std::io::Read;
use std::time::Duration;

use log::debug;

use crate::codec::{Frame, decode_packet, next_frame};
use crate::error::Result;
use crate::packet::Packet;

/// How the end of a bulk burst is recognised.
///
/// The burst always ends when the peer closes its side on a record boundary.
/// With `idle` set, a read that sees no new record for that long after at
/// least one record was decoded also ends it; the stream must then be
/// configured with a matching read timeout. The first record is always
/// waited for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstEnd {
    pub idle: Option<Duration>,
}

impl BurstEnd {
    pub fn on_close() -> Self {
        Self { idle: None }
    }

    pub fn after_idle(idle: Duration) -> Self {
        Self { idle: Some(idle) }
    }
}

/// Drain a burst of records.
pub fn read_all<R: Read>(stream: &mut R, end: BurstEnd) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    loop {
        match next_frame(stream, end.idle.is_some())? {
            Frame::Record(p) => packets.push(p),
            Frame::Eof => { debug!("burst closed by peer after {} packets", packets.len()); break; }
            Frame::Idle if packets.is_empty() => continue,
            Frame::Idle => { debug!("burst idle after {} packets", packets.len()); break; }
        }
    }
    Ok(packets)
}

/// Read exactly one record and leave anything after it unread.
pub fn read_one<R: Read>(stream: &mut R) -> Result<Packet> {
    decode_packet(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use std::io::{self, Cursor, ErrorKind};

    fn wire(seqs: &[i32]) -> Vec<u8> {
        seqs.iter().flat_map(|s| Packet::new("TSLA", 'B', 5, 250, *s).to_wire()).collect()
    }

    /// Yields the data then times out forever, like a socket with a read timeout.
    struct Stalls { data: Cursor<Vec<u8>> }

    impl Read for Stalls {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(ErrorKind::WouldBlock, "timed out")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_all_stops_on_boundary_close() {
        let mut c = Cursor::new(wire(&[1, 2, 4]));
        let got = read_all(&mut c, BurstEnd::on_close()).unwrap();
        assert_eq!(got.iter().map(|p| p.sequence).collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn single_complete_record_then_close_is_clean() {
        let mut c = Cursor::new(wire(&[1]));
        assert_eq!(read_all(&mut c, BurstEnd::on_close()).unwrap().len(), 1);
    }

    #[test]
    fn empty_burst_is_empty() {
        let mut c = Cursor::new(Vec::new());
        assert!(read_all(&mut c, BurstEnd::on_close()).unwrap().is_empty());
    }

    #[test]
    fn close_mid_record_is_short_read() {
        let mut bytes = wire(&[1, 2]);
        bytes.truncate(17 + 6);
        let mut c = Cursor::new(bytes);
        assert!(matches!(read_all(&mut c, BurstEnd::on_close()), Err(FeedError::ShortRead { got: 6 })));
    }

    #[test]
    fn idle_timeout_ends_burst_only_when_enabled() {
        let mut s = Stalls { data: Cursor::new(wire(&[1, 2])) };
        let got = read_all(&mut s, BurstEnd::after_idle(Duration::from_millis(50))).unwrap();
        assert_eq!(got.len(), 2);

        let mut s = Stalls { data: Cursor::new(wire(&[1, 2])) };
        assert!(matches!(read_all(&mut s, BurstEnd::on_close()), Err(FeedError::Io(_))));
    }

    #[test]
    fn idle_timeout_mid_record_is_short_read() {
        let mut bytes = wire(&[1]);
        bytes.truncate(10);
        let mut s = Stalls { data: Cursor::new(bytes) };
        let r = read_all(&mut s, BurstEnd::after_idle(Duration::from_millis(50)));
        assert!(matches!(r, Err(FeedError::ShortRead { got: 10 })));
    }

    /// Times out `stalls` times before handing out its data, then closes.
    struct SlowStart { stalls: usize, data: Cursor<Vec<u8>> }

    impl Read for SlowStart {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(io::Error::new(ErrorKind::WouldBlock, "timed out"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn idle_before_first_record_keeps_waiting() {
        let mut s = SlowStart { stalls: 3, data: Cursor::new(wire(&[1, 2])) };
        let got = read_all(&mut s, BurstEnd::after_idle(Duration::from_millis(50))).unwrap();
        assert_eq!(got.iter().map(|p| p.sequence).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn read_one_on_closed_stream_is_short_read() {
        let mut c = Cursor::new(Vec::new());
        assert!(matches!(read_one(&mut c), Err(FeedError::ShortRead { got: 0 })));
    }

    #[test]
    fn read_one_leaves_the_rest() {
        let mut c = Cursor::new(wire(&[7, 8]));
        assert_eq!(read_one(&mut c).unwrap().sequence, 7);
        assert_eq!(c.position(), 17);
    }
}
