//! Listener management: one deception listener per configured port.

pub mod tcp;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::RecordStore;

/// Service greetings sent to a new connection, keyed by port. Ports without
/// an entry stay silent until the peer speaks.
pub const SERVICE_BANNERS: &[(u16, &str)] = &[
    (21, "220 FTP server ready\r\n"),
    (22, "SSH-2.0-OpenSSH_8.2p1 Ubuntu-4ubuntu0.1\r\n"),
    (80, "HTTP/1.1 200 OK\r\nServer: Apache/2.4.41 (Ubuntu)\r\n\r\n"),
    (443, "HTTP/1.1 200 OK\r\nServer: Apache/2.4.41 (Ubuntu)\r\n\r\n"),
];

/// The greeting for a port, if it emulates a known service.
pub fn banner_for(port: u16) -> Option<&'static str> {
    SERVICE_BANNERS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, banner)| *banner)
}

/// Start one listener per configured port. Listeners run as detached tasks
/// for the process lifetime; a listener that fails to bind is logged and
/// that port simply provides no coverage for this run.
pub async fn start_all(config: &Config, store: RecordStore) -> Result<()> {
    let limits = Arc::new(Semaphore::new(config.capture.max_connections));
    let idle_timeout = Duration::from_secs(config.capture.idle_timeout_secs);

    for &port in &config.capture.ports {
        let host = config.capture.host.clone();
        let store = store.clone();
        let limits = limits.clone();

        tokio::spawn(async move {
            let listener = match tcp::PortListener::bind(&host, port, banner_for(port)).await {
                Ok(l) => l,
                Err(e) => {
                    warn!("Cannot bind listener to {}:{}: {}", host, port, e);
                    return;
                }
            };
            if let Err(e) = listener.serve(store, limits, idle_timeout).await {
                warn!("Listener on port {} stopped: {}", port, e);
            }
        });
    }

    info!("Started {} port listeners", config.capture.ports.len());
    Ok(())
}
