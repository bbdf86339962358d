//! Client settings, independent of how they were parsed.
use std::path::PathBuf;
use std::time::Duration;

use time::macros::format_description;

use crate::codec::ResendWidth;
use crate::connect::TcpConnector;
use crate::reader::BurstEnd;
use crate::recovery::RecoveryOptions;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OUT: &str = "output.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Option<Duration>,
    /// `None` waits for the server to close the bulk stream.
    pub idle_timeout: Option<Duration>,
    pub resend_width: ResendWidth,
    pub out: PathBuf,
    pub capture: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            idle_timeout: None,
            resend_width: ResendWidth::Narrow,
            out: PathBuf::from(DEFAULT_OUT),
            capture: None,
        }
    }
}

impl ClientConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.addr()).with_connect_timeout(self.connect_timeout)
    }

    pub fn recovery_options(&self) -> RecoveryOptions {
        RecoveryOptions { burst_end: BurstEnd { idle: self.idle_timeout }, resend_width: self.resend_width }
    }
}

/// `captures/feed_YYYY_MM_DD.bin` for today's local date (UTC if the local
/// offset cannot be determined).
pub fn default_capture_path() -> PathBuf {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let date = now
        .format(format_description!("[year]_[month]_[day]"))
        .unwrap_or_else(|_| "undated".to_string());
    let mut p = PathBuf::from("captures");
    p.push(format!("feed_{date}.bin"));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let c = ClientConfig::default();
        assert_eq!(c.addr(), "127.0.0.1:3000");
        assert_eq!(c.out, PathBuf::from("output.json"));
        assert_eq!(c.recovery_options(), RecoveryOptions::default());
    }

    #[test]
    fn idle_timeout_flows_into_burst_end() {
        let c = ClientConfig { idle_timeout: Some(Duration::from_millis(200)), ..ClientConfig::default() };
        assert_eq!(c.recovery_options().burst_end, BurstEnd::after_idle(Duration::from_millis(200)));
    }

    #[test]
    fn capture_path_is_dated() {
        let p = default_capture_path();
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(p.starts_with("captures"));
        assert!(name.starts_with("feed_") && name.ends_with(".bin"), "{name}");
        assert_eq!(name.len(), "feed_2024_01_31.bin".len());
    }
}
