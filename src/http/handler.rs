use std::future::Future;

use crate::http::hijack::Hijack;
use crate::http::request::Request;
use crate::http::response::Response;

/// What a handler did with the request it was given.
#[derive(Debug)]
pub enum Disposition {
    /// The HTTP path is intact; the connection writes this response.
    Respond(Response),
    /// The handler took the raw stream; the connection must not touch it.
    Hijacked,
}

/// Application code invoked once per parsed request.
///
/// `conn` lets the handler detach the client stream. A handler that hijacks
/// owns the stream from then on and must return [`Disposition::Hijacked`].
pub trait Handler<S>: Send + Sync + 'static {
    fn handle(
        &self,
        request: Request,
        conn: &mut (dyn Hijack<S> + Send),
    ) -> impl Future<Output = Disposition> + Send;
}
