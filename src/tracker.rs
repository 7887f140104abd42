//! Open-socket accounting.
//!
//! Every socket the relay owns is wrapped in [`Tracked`], which bumps a
//! shared counter on creation and lowers it when the socket is dropped. Once
//! all connection tasks have finished the counter reads zero.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Clone, Default)]
pub struct SocketTracker {
    open: Arc<AtomicUsize>,
}

impl SocketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked sockets not yet dropped.
    pub fn open(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub fn track<S>(&self, stream: S) -> Tracked<S> {
        self.open.fetch_add(1, Ordering::AcqRel);
        Tracked {
            inner: stream,
            open: Arc::clone(&self.open),
        }
    }
}

/// A socket counted by a [`SocketTracker`] until dropped.
#[derive(Debug)]
pub struct Tracked<S> {
    inner: S,
    open: Arc<AtomicUsize>,
}

impl<S> Drop for Tracked<S> {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Tracked<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tracked<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
