//! Per-request hijack-and-relay.
//!
//! For every request the forwarder:
//! 1. Dials the backend (bounded by the dial timeout)
//! 2. Hijacks the client stream from the HTTP layer
//! 3. Writes the request onto the backend exactly as it was received,
//!    streaming any body bytes that had not arrived yet
//! 4. Copies backend bytes to the client until the backend closes
//! 5. Drops both sockets
//!
//! Failures in 1 and 2 still get an HTTP answer. After 2 the client socket
//! is raw bytes, so any failure just closes both ends.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::TimeoutConfig;
use crate::http::body::RemainingBody;
use crate::http::handler::{Disposition, Handler};
use crate::http::hijack::{Hijack, Hijacked};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::proxy::error::ForwardError;
use crate::proxy::pump::{copy_request_body, copy_with_idle_timeout, write_request};
use crate::tracker::{SocketTracker, Tracked};

/// Relays each request to a single fixed backend.
#[derive(Debug, Clone)]
pub struct Forwarder {
    /// Backend address as `host:port`, shared read-only by every unit.
    target: Arc<str>,
    timeouts: TimeoutConfig,
    sockets: SocketTracker,
}

impl Forwarder {
    pub fn new(target: impl Into<Arc<str>>, timeouts: TimeoutConfig) -> Self {
        Self {
            target: target.into(),
            timeouts,
            sockets: SocketTracker::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Tracks backend sockets and hijacked client sockets currently held.
    pub fn sockets(&self) -> &SocketTracker {
        &self.sockets
    }

    /// Opens a fresh connection to the backend.
    pub async fn dial(&self) -> Result<Tracked<TcpStream>, ForwardError> {
        let after = self.timeouts.dial();
        let stream = timeout(after, TcpStream::connect(&*self.target))
            .await
            .map_err(|_| ForwardError::DialTimeout {
                target: self.target.to_string(),
                after,
            })?
            .map_err(|source| ForwardError::Dial {
                target: self.target.to_string(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY on backend socket");
        }

        Ok(self.sockets.track(stream))
    }

    /// Writes the request to the backend, followed by the `remaining` body
    /// read from the client, then streams the backend's bytes to the client.
    /// Both streams are dropped on return, whatever the outcome.
    pub async fn relay<C, B>(
        &self,
        request: &Request,
        remaining: RemainingBody,
        mut client: C,
        mut backend: B,
    ) -> Result<u64, ForwardError>
    where
        C: AsyncRead + AsyncWrite + Unpin,
        B: AsyncRead + AsyncWrite + Unpin,
    {
        let idle = self.timeouts.idle();
        let total = self.timeouts.total();

        let exchange = async {
            write_request(&mut backend, &request.to_bytes(), idle).await?;
            if !remaining.is_done() {
                let streamed = copy_request_body(&mut client, &mut backend, remaining, idle).await?;
                tracing::trace!(bytes = streamed, "Request body streamed to backend");
            }
            tracing::trace!("Request sent to backend");

            copy_with_idle_timeout(&mut backend, &mut client, idle).await
        };

        timeout(total, exchange)
            .await
            .map_err(|_| ForwardError::TotalTimeout(total))?
    }

    async fn forward<S>(
        &self,
        request: Request,
        conn: &mut (dyn Hijack<S> + Send),
    ) -> Result<u64, ForwardError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let backend = self.dial().await?;

        // Dropping `backend` on a failed hijack closes the backend socket.
        let Hijacked {
            stream,
            buffered,
            remaining,
        } = conn.hijack()?;
        let client = self.sockets.track(stream);

        if !buffered.is_empty() {
            tracing::debug!(
                bytes = buffered.len(),
                "Discarding client bytes sent past the forwarded request"
            );
        }

        self.relay(&request, remaining, client, backend).await
    }
}

impl<S> Handler<S> for Forwarder
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn handle(&self, request: Request, conn: &mut (dyn Hijack<S> + Send)) -> Disposition {
        let method = request.method.clone();
        let path = request.path.clone();

        match self.forward(request, conn).await {
            Ok(bytes) => {
                tracing::info!(
                    backend = %self.target,
                    %method,
                    %path,
                    bytes,
                    "Request forwarded"
                );
                Disposition::Hijacked
            }
            Err(e) if e.is_before_hijack() => {
                let response = match &e {
                    ForwardError::Hijack(_) => {
                        tracing::error!(error = %e, %method, %path, "Hijack failed");
                        Response::internal_error()
                    }
                    _ => {
                        tracing::warn!(error = %e, %method, %path, "Backend unavailable");
                        Response::bad_gateway()
                    }
                };
                Disposition::Respond(response)
            }
            Err(e) => {
                tracing::warn!(
                    backend = %self.target,
                    error = %e,
                    %method,
                    %path,
                    "Forwarding aborted after hijack"
                );
                Disposition::Hijacked
            }
        }
    }
}
