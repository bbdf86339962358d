//! One complete client run driven by a [`ClientConfig`].
use log::info;

use crate::capture::{CAPTURE_VERSION, CaptureHeader, CaptureWriter, now_unix_ns};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::output::JsonFileSink;
use crate::recovery::{Collected, Recovery, deliver};

/// Collect and repair the feed, write the capture journal if one is
/// configured, then write the output document. The journal goes first so a
/// failed journal leaves no output file behind.
pub fn run(config: &ClientConfig) -> Result<Collected> {
    info!("connecting to {}", config.addr());
    let mut recovery = Recovery::new(config.connector(), config.recovery_options());
    let mut collected = recovery.collect()?;

    if let Some(path) = &config.capture {
        let header = CaptureHeader { version: CAPTURE_VERSION, created_unix_ns: now_unix_ns(), server: config.addr() };
        CaptureWriter::create(path)?.write_run(header, &collected.wire)?;
        info!("capture written to {} ({} packets)", path.display(), collected.wire.len());
    }

    deliver(&mut collected, &mut JsonFileSink::new(&config.out))?;
    Ok(collected)
}
