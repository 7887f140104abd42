//! Detaching a raw stream from the HTTP layer.
//!
//! Once a handler hijacks its connection the HTTP state machine stops
//! touching the socket: it writes no response and does not close it. The
//! [`Hijacked`] value becomes the sole owner, and dropping it closes the
//! stream.

use bytes::Bytes;

use crate::http::body::RemainingBody;

/// Why a connection could not be handed over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HijackError {
    /// The stream was already taken by an earlier hijack.
    #[error("connection already hijacked")]
    AlreadyHijacked,
    /// The transport cannot be detached from its HTTP framing.
    #[error("transport does not support hijacking")]
    Unsupported,
}

/// A raw client stream taken over from the HTTP layer.
#[derive(Debug)]
pub struct Hijacked<S> {
    /// The client stream, owned exclusively by the holder.
    pub stream: S,
    /// Bytes the client already sent beyond the current request.
    pub buffered: Bytes,
    /// How much of the request body is still to be read from `stream`.
    pub remaining: RemainingBody,
}

/// The capability to detach the underlying stream of the current request.
///
/// Succeeds at most once; every later call returns
/// [`HijackError::AlreadyHijacked`].
pub trait Hijack<S> {
    fn hijack(&mut self) -> Result<Hijacked<S>, HijackError>;
}
