#![allow(dead_code)]

use std::net::SocketAddr;
use std::thread::JoinHandle;

use feed_recovery::server::FeedServer;

pub mod setup {
    pub mod log {
        use std::sync::Once;
        static SETUP: Once = Once::new();
        pub fn configure() {
            SETUP.call_once(|| {
                let _ = env_logger::builder()
                    .is_test(true)
                    .filter_level(log::LevelFilter::Trace)
                    .try_init();
            });
        }
    }
}

/// Run `server` on a background thread for exactly `connections` connections.
pub fn spawn(server: FeedServer, connections: usize) -> (SocketAddr, JoinHandle<()>) {
    let addr = server.local_addr().unwrap();
    let handle = std::thread::spawn(move || server.serve(Some(connections)).unwrap());
    (addr, handle)
}
