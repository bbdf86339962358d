use anyhow::{Context, Result, bail};
use clap::Parser;
use feed_recovery::capture::CaptureReader;
use feed_recovery::codec::ResendWidth;
use feed_recovery::server::{FeedServer, synthetic_packets};
use feed_recovery::Packet;
use log::info;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(about = "Serve a trade feed over the stream/resend protocol for testing clients")]
struct Args {
    /// Listen address
    #[arg(long, env = "FEED_LISTEN", default_value = "127.0.0.1:3000")]
    listen: String,

    /// Capture journal to replay (distinct sequences, first occurrence wins)
    #[arg(long, short = 'i', conflicts_with = "count")]
    input: Option<PathBuf>,

    /// Number of synthetic packets when no journal is given
    #[arg(long, default_value_t = 14)]
    count: usize,

    /// Sequences left out of the bulk stream (comma separated)
    #[arg(long, value_delimiter = ',')]
    drop: Vec<i32>,

    /// Expect 32-bit resend sequences
    #[arg(long, default_value_t = false)]
    wide_resend: bool,

    /// Exit after this many connections
    #[arg(long)]
    max_connections: Option<usize>,
}

fn load(path: &Path) -> Result<Vec<Packet>> {
    let (header, records) = CaptureReader::open(path)
        .and_then(|r| r.read_run())
        .with_context(|| format!("open {:?}", path))?;
    let mut seen = HashSet::new();
    let packets: Vec<Packet> = records.into_iter().map(|r| r.packet).filter(|p| seen.insert(p.sequence)).collect();
    if packets.is_empty() { bail!("capture {:?} holds no packets", path); }
    info!("loaded {} packets captured from {}", packets.len(), header.server);
    Ok(packets)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let packets = match &args.input {
        Some(path) => load(path)?,
        None => synthetic_packets(args.count),
    };
    let width = if args.wide_resend { ResendWidth::Wide } else { ResendWidth::Narrow };
    let server = FeedServer::bind(&args.listen, packets)
        .with_context(|| format!("bind {}", args.listen))?
        .withhold(args.drop)
        .with_resend_width(width);
    server.serve(args.max_connections)?;
    Ok(())
}
