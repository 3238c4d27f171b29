//! TCP deception listener and per-connection capture handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use crate::store::{ActivityRecord, RecordStore};

/// Accept backlog for each deception socket.
const LISTEN_BACKLOG: u32 = 5;

/// Largest chunk captured per read.
const READ_CHUNK: usize = 1024;

/// Canned reply sent after every captured chunk.
pub const REJECTION: &[u8] = b"Command not recognized.\r\n";

/// One bound deception socket. Accepts connections forever and spawns a
/// capture handler per connection.
pub struct PortListener {
    listener: TcpListener,
    port: u16,
    banner: Option<&'static str>,
}

impl PortListener {
    /// Bind to `host:port`. Binding port 0 picks an ephemeral port; the
    /// port actually bound is what ends up in captured records.
    pub async fn bind(host: &str, port: u16, banner: Option<&'static str>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        let port = listener.local_addr()?.port();

        info!("Listening on {}:{}", host, port);
        Ok(Self {
            listener,
            port,
            banner,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Each accepted connection takes one permit from `limits`
    /// for its handler's lifetime, so only live connections consume
    /// capacity; when the cap is exhausted, further connections queue here
    /// until a handler finishes. Accept errors are treated as transient.
    pub async fn serve(
        self,
        store: RecordStore,
        limits: Arc<Semaphore>,
        idle_timeout: Duration,
    ) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let permit = limits.clone().acquire_owned().await?;
                    info!(
                        "Accepted connection from {}:{} on port {}",
                        peer_addr.ip(),
                        peer_addr.port(),
                        self.port
                    );
                    let ip = peer_addr.ip().to_string();
                    let port = self.port;
                    let banner = self.banner;
                    let store = store.clone();

                    tokio::spawn(async move {
                        handle_connection(socket, ip, port, banner, store, idle_timeout, permit)
                            .await;
                    });
                }
                Err(e) => {
                    warn!("Accept error on port {}: {}", self.port, e);
                }
            }
        }
    }
}

/// Emulate one step of service interaction: greet, then capture every chunk
/// the peer sends, answering each with the canned rejection. The socket
/// closes on every exit path when it drops.
async fn handle_connection(
    mut socket: TcpStream,
    ip: String,
    port: u16,
    banner: Option<&'static str>,
    store: RecordStore,
    idle_timeout: Duration,
    _permit: OwnedSemaphorePermit,
) {
    if let Some(banner) = banner {
        if let Err(e) = socket.write_all(banner.as_bytes()).await {
            debug!("Failed to send banner to {}: {}", ip, e);
            return;
        }
    }

    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match tokio::time::timeout(idle_timeout, socket.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                let record = ActivityRecord::capture(ip.clone(), port, &buf[..n]);
                if let Err(e) = store.append(&record).await {
                    error!("Failed to record activity from {}: {}", ip, e);
                    break;
                }
                if let Err(e) = socket.write_all(REJECTION).await {
                    debug!("Connection from {} dropped mid-reply: {}", ip, e);
                    break;
                }
            }
            Ok(Err(e)) => {
                debug!("Read error from {} on port {}: {}", ip, port, e);
                break;
            }
            Err(_) => {
                debug!("Idle timeout for {} on port {}", ip, port);
                break;
            }
        }
    }
}
