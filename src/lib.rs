//! hijack-relay - transparent single-target HTTP relay
//!
//! Accepts HTTP/1.1 requests, detaches the client socket from the HTTP layer,
//! writes the request onto a fresh backend connection and streams the
//! backend's bytes back unmodified.

pub mod config;
pub mod http;
pub mod proxy;
pub mod server;
pub mod tracker;
