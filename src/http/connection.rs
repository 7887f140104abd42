use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::{Instant, timeout_at};

use crate::http::body::RemainingBody;
use crate::http::handler::{Disposition, Handler};
use crate::http::hijack::{Hijack, HijackError, Hijacked};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

const READ_CHUNK: usize = 4096;

/// One client stream framed as HTTP/1.1 until a handler hijacks it.
///
/// Handlers see a request as soon as its head is parsed, carrying whatever
/// body bytes came with it. When a handler answers before the rest of the
/// body arrived, the connection closes after the response.
pub struct Connection<S> {
    stream: Option<S>,
    buffer: BytesMut,
    state: ConnectionState,
    /// Body of the current request still unread on the stream.
    pending: RemainingBody,
    read_timeout: Option<Duration>,
}

#[derive(Debug)]
enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Hijacked,
    Closed,
}

enum ReadOutcome {
    Request(Request),
    Eof,
    Malformed(ParseError),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            pending: RemainingBody::Done,
            read_timeout: None,
        }
    }

    /// Bounds how long the connection waits for a whole request head,
    /// counted from the first read for that request.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = Some(read_timeout);
        self
    }

    pub fn is_hijacked(&self) -> bool {
        matches!(self.state, ConnectionState::Hijacked)
    }

    /// Drives the connection until it closes or a handler hijacks it.
    pub async fn run<H>(&mut self, handler: &H) -> anyhow::Result<()>
    where
        H: Handler<S>,
    {
        loop {
            let next = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await? {
                    ReadOutcome::Request(req) => ConnectionState::Processing(req),
                    ReadOutcome::Eof => ConnectionState::Closed,
                    ReadOutcome::Malformed(e) => {
                        tracing::debug!(error = %e, "Rejecting malformed request");
                        let response = Response::bad_request().with_header("Connection", "close");
                        ConnectionState::Writing(ResponseWriter::new(&response), false)
                    }
                },

                ConnectionState::Processing(req) => {
                    // An unread body leaves the stream unframed for a next request
                    let keep_alive = req.keep_alive() && self.pending.is_done();
                    let disposition = handler.handle(req, self).await;

                    if self.stream.is_none() {
                        if let Disposition::Respond(resp) = disposition {
                            tracing::error!(
                                status = resp.status.as_u16(),
                                "Handler returned a response after hijacking, dropping it"
                            );
                        }
                        ConnectionState::Hijacked
                    } else {
                        match disposition {
                            Disposition::Respond(resp) => {
                                let resp = if keep_alive {
                                    resp
                                } else {
                                    resp.with_header("Connection", "close")
                                };
                                ConnectionState::Writing(ResponseWriter::new(&resp), keep_alive)
                            }
                            Disposition::Hijacked => {
                                tracing::error!("Handler reported a hijack without taking the stream");
                                ConnectionState::Closed
                            }
                        }
                    }
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    let stream = self
                        .stream
                        .as_mut()
                        .ok_or_else(|| anyhow::anyhow!("stream missing while writing"))?;
                    writer.write_to_stream(stream).await?;

                    if keep_alive {
                        ConnectionState::Reading // go back for next request
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Hijacked => {
                    self.state = ConnectionState::Hijacked;
                    break;
                }

                ConnectionState::Closed => {
                    break;
                }
            };

            self.state = next;
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        let deadline = self.read_timeout.map(|limit| Instant::now() + limit);

        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed, remaining)) => {
                    self.buffer.advance(consumed);
                    self.pending = remaining;
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data
                }

                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            let Some(stream) = self.stream.as_mut() else {
                return Ok(ReadOutcome::Eof);
            };

            self.buffer.reserve(READ_CHUNK);
            let read = stream.read_buf(&mut self.buffer);
            let n = match deadline {
                Some(deadline) => match timeout_at(deadline, read).await.ok() {
                    Some(n) => n?,
                    None if self.buffer.is_empty() => {
                        tracing::debug!("Idle connection timed out");
                        return Ok(ReadOutcome::Eof);
                    }
                    None => anyhow::bail!("timed out reading request"),
                },
                None => read.await?,
            };

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        buffered = self.buffer.len(),
                        "Client closed mid-request"
                    );
                }
                return Ok(ReadOutcome::Eof);
            }
        }
    }
}

impl<S> Hijack<S> for Connection<S> {
    fn hijack(&mut self) -> Result<Hijacked<S>, HijackError> {
        let stream = self.stream.take().ok_or(HijackError::AlreadyHijacked)?;
        let buffered = self.buffer.split().freeze();
        let remaining = std::mem::replace(&mut self.pending, RemainingBody::Done);
        self.state = ConnectionState::Hijacked;

        Ok(Hijacked {
            stream,
            buffered,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn second_hijack_fails() {
        let (_client, server) = duplex(64);
        let mut conn = Connection::new(server);

        assert!(conn.hijack().is_ok());
        assert!(conn.is_hijacked());
        assert_eq!(conn.hijack().unwrap_err(), HijackError::AlreadyHijacked);
    }
}
