use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use feed_recovery::client;
use feed_recovery::codec::ResendWidth;
use feed_recovery::config::{ClientConfig, DEFAULT_HOST, DEFAULT_OUT, DEFAULT_PORT, default_capture_path};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Fetch the full trade feed, repair sequence gaps and write it as JSON")]
struct Args {
    /// Feed server host
    #[arg(long, env = "FEED_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Feed server port
    #[arg(long, env = "FEED_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Output JSON file
    #[arg(long, env = "OUT_FILE", default_value = DEFAULT_OUT)]
    out: PathBuf,

    /// End the bulk stream after this many idle milliseconds instead of
    /// waiting for the server to close it
    #[arg(long, env = "FEED_IDLE_TIMEOUT_MS")]
    idle_timeout_ms: Option<u64>,

    /// Give up connecting after this many milliseconds
    #[arg(long, env = "FEED_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: Option<u64>,

    /// Send resend sequences as 32-bit values (server must support it)
    #[arg(long, env = "FEED_WIDE_RESEND", default_value_t = false)]
    wide_resend: bool,

    /// Also write a capture journal; defaults to captures/feed_YYYY_MM_DD.bin
    #[arg(long, env = "CAPTURE_FILE", num_args = 0..=1)]
    capture: Option<Option<PathBuf>>,
}

impl Args {
    fn into_config(self) -> ClientConfig {
        ClientConfig {
            host: self.host,
            port: self.port,
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            idle_timeout: self.idle_timeout_ms.map(Duration::from_millis),
            resend_width: if self.wide_resend { ResendWidth::Wide } else { ResendWidth::Narrow },
            out: self.out,
            capture: self.capture.map(|p| p.unwrap_or_else(default_capture_path)),
        }
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Args::parse().into_config();
    client::run(&config).with_context(|| format!("recovering feed from {}", config.addr()))?;
    Ok(())
}
