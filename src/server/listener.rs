//! Listener/acceptor and lifecycle.
//!
//! [`Server::bind`] claims the address up front so a bind failure surfaces
//! before anything runs. [`Server::start`] spawns the accept loop and
//! returns at once; each accepted socket gets its own task.
//!
//! Shutdown policy: [`ServerHandle::stop`] closes the listener first, then
//! gives in-flight connections up to the drain timeout to finish. Whatever
//! is still running after that is aborted, which drops (and so closes)
//! every socket those tasks own.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::TimeoutConfig;
use crate::http::connection::Connection;
use crate::http::handler::Handler;
use crate::tracker::{SocketTracker, Tracked};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Deadline for a whole request head to arrive.
    pub read_request_timeout: Duration,
    /// How long `stop` waits for in-flight connections.
    pub drain_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for ServerOptions {
    fn from(timeouts: &TimeoutConfig) -> Self {
        Self {
            read_request_timeout: timeouts.read_request(),
            drain_timeout: timeouts.drain(),
        }
    }
}

/// A bound listener that has not started accepting yet.
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    options: ServerOptions,
    sockets: SocketTracker,
}

impl<H> Server<H>
where
    H: Handler<Tracked<TcpStream>>,
{
    pub async fn bind(addr: &str, handler: H, options: ServerOptions) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            options,
            sockets: SocketTracker::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    /// Spawns the accept loop and returns without blocking.
    pub fn start(self) -> anyhow::Result<ServerHandle> {
        let local_addr = self.local_addr()?;
        let sockets = self.sockets.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("Listening on {}", local_addr);
        let task = tokio::spawn(accept_loop(
            self.listener,
            self.handler,
            self.options,
            self.sockets,
            shutdown_rx,
        ));

        Ok(ServerHandle {
            local_addr,
            sockets,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Control over a running server. Dropping it also stops accepting.
pub struct ServerHandle {
    local_addr: SocketAddr,
    sockets: SocketTracker,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Tracks accepted client sockets still open.
    pub fn sockets(&self) -> &SocketTracker {
        &self.sockets
    }

    /// Stops accepting, drains in-flight connections, then aborts the rest.
    pub async fn stop(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await.context("accept loop panicked")?;
        info!(addr = %self.local_addr, "Server stopped");
        Ok(())
    }
}

async fn accept_loop<H>(
    listener: TcpListener,
    handler: Arc<H>,
    options: ServerOptions,
    sockets: SocketTracker,
    mut shutdown: watch::Receiver<bool>,
) where
    H: Handler<Tracked<TcpStream>>,
{
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    debug!(%peer, "Accepted connection");
                    if let Err(e) = socket.set_nodelay(true) {
                        debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
                    }

                    let socket = sockets.track(socket);
                    let handler = Arc::clone(&handler);
                    let read_timeout = options.read_request_timeout;

                    connections.spawn(async move {
                        let mut conn = Connection::new(socket).with_read_timeout(read_timeout);
                        match conn.run(&*handler).await {
                            Ok(()) => debug!(%peer, hijacked = conn.is_hijacked(), "Connection finished"),
                            Err(e) => warn!(%peer, error = %e, "Connection error"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },

            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        error!(error = %e, "Connection task panicked");
                    }
                }
            }
        }
    }

    drop(listener);

    if connections.is_empty() {
        return;
    }

    info!(in_flight = connections.len(), "Draining connections");
    let drained = timeout(options.drain_timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = connections.len(),
            "Drain timeout elapsed, closing remaining connections"
        );
        connections.shutdown().await;
    }
}
