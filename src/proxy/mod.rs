//! The forwarding half of the relay.
//!
//! [`Forwarder`] is the [`Handler`](crate::http::Handler) that hijacks each
//! client connection and pumps the backend's response back to it.

pub mod error;
pub mod forwarder;
pub mod pump;

pub use error::ForwardError;
pub use forwarder::Forwarder;
