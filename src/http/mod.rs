//! HTTP/1.1 framing up to the point of hijack.
//!
//! The relay only needs enough HTTP to find where one request ends, answer
//! with an error when the backend is unreachable, and then step aside.
//!
//! # Architecture
//!
//! - **`body`**: tracks where a streamed request body ends
//! - **`connection`**: per-socket state machine driving a [`handler::Handler`]
//! - **`hijack`**: detaching the raw stream from the connection
//! - **`handler`**: the seam between framing and application code
//! - **`parser`**: parses incoming requests from byte buffers
//! - **`request`**: request representation and serialization
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request head received
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Handler runs
//!        └──────┬───────────┘
//!               ├─ Hijacked → Hijacked (stream now owned by the handler)
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod body;
pub mod connection;
pub mod handler;
pub mod hijack;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use body::{ChunkedScanner, RemainingBody};
pub use connection::Connection;
pub use handler::{Disposition, Handler};
pub use hijack::{Hijack, HijackError, Hijacked};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
