//! Byte pumping with idle deadlines.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::body::RemainingBody;
use crate::proxy::error::ForwardError;

/// Default buffer size for streaming
pub const BUFFER_SIZE: usize = 8192;

/// Runs one I/O step, failing with `IdleTimeout` if it stalls past `idle`.
async fn step<T, F>(idle: Duration, io: F) -> Result<io::Result<T>, ForwardError>
where
    F: Future<Output = io::Result<T>>,
{
    timeout(idle, io)
        .await
        .map_err(|_| ForwardError::IdleTimeout(idle))
}

/// Writes `bytes` in full, treating a stall longer than `idle` as fatal.
pub async fn write_request<W>(writer: &mut W, bytes: &[u8], idle: Duration) -> Result<(), ForwardError>
where
    W: AsyncWrite + Unpin,
{
    step(idle, writer.write_all(bytes))
        .await?
        .map_err(ForwardError::WriteRequest)?;
    step(idle, writer.flush())
        .await?
        .map_err(ForwardError::WriteRequest)
}

/// Streams the rest of a request body from the client to the backend.
///
/// Reads never run past the end of a Content-Length body. A chunked body is
/// scanned as it passes and bytes after its terminator are dropped. Returns
/// the number of body bytes forwarded.
pub async fn copy_request_body<R, W>(
    reader: &mut R,
    writer: &mut W,
    mut remaining: RemainingBody,
    idle: Duration,
) -> Result<u64, ForwardError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut copied = 0u64;

    while !remaining.is_done() {
        let limit = remaining.read_limit(buf.len());
        let n = step(idle, reader.read(&mut buf[..limit]))
            .await?
            .map_err(ForwardError::RequestBody)?;

        if n == 0 {
            return Err(ForwardError::RequestBody(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "client closed before the request body ended",
            )));
        }

        let used = remaining
            .advance(&buf[..n])
            .map_err(ForwardError::InvalidBody)?;
        if used < n {
            tracing::debug!(
                bytes = n - used,
                "Discarding client bytes sent past the request body"
            );
        }

        step(idle, writer.write_all(&buf[..used]))
            .await?
            .map_err(ForwardError::WriteRequest)?;
        copied += used as u64;
    }

    step(idle, writer.flush())
        .await?
        .map_err(ForwardError::WriteRequest)?;

    Ok(copied)
}

/// Copies `reader` into `writer` until `reader` reaches end-of-stream.
///
/// Each read and each write must make progress within `idle`. Bytes are
/// passed through unmodified through a single fixed buffer. Returns the
/// number of bytes copied.
pub async fn copy_with_idle_timeout<R, W>(
    reader: &mut R,
    writer: &mut W,
    idle: Duration,
) -> Result<u64, ForwardError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let n = step(idle, reader.read(&mut buf))
            .await?
            .map_err(ForwardError::CopyResponse)?;

        if n == 0 {
            break;
        }

        step(idle, writer.write_all(&buf[..n]))
            .await?
            .map_err(ForwardError::CopyResponse)?;
        copied += n as u64;
    }

    step(idle, writer.flush())
        .await?
        .map_err(ForwardError::CopyResponse)?;

    Ok(copied)
}
