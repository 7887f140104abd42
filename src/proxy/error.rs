use std::io;
use std::time::Duration;

use crate::http::hijack::HijackError;
use crate::http::parser::ParseError;

/// Everything that can end a forwarding unit early.
///
/// Only the variants before the hijack can still be answered with an HTTP
/// status; after it the client just sees the connection close.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("connecting to {target} timed out after {after:?}")]
    DialTimeout { target: String, after: Duration },

    #[error("failed to hijack client connection: {0}")]
    Hijack(#[from] HijackError),

    #[error("failed to forward request: {0}")]
    WriteRequest(#[source] io::Error),

    #[error("failed to read request body from client: {0}")]
    RequestBody(#[source] io::Error),

    #[error("malformed request body: {0}")]
    InvalidBody(#[source] ParseError),

    #[error("failed to forward response: {0}")]
    CopyResponse(#[source] io::Error),

    #[error("no bytes moved for {0:?}")]
    IdleTimeout(Duration),

    #[error("exchange exceeded {0:?}")]
    TotalTimeout(Duration),
}

impl ForwardError {
    /// Whether the client connection still speaks HTTP.
    pub fn is_before_hijack(&self) -> bool {
        matches!(
            self,
            ForwardError::Dial { .. } | ForwardError::DialTimeout { .. } | ForwardError::Hijack(_)
        )
    }
}
