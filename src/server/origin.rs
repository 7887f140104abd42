//! The demo backend: answers every request with a fixed greeting.

use crate::http::handler::{Disposition, Handler};
use crate::http::hijack::Hijack;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

pub const GREETING: &str = "Hello from the server!";

#[derive(Debug, Clone, Copy, Default)]
pub struct Origin;

impl<S> Handler<S> for Origin
where
    S: Send + 'static,
{
    async fn handle(&self, request: Request, _conn: &mut (dyn Hijack<S> + Send)) -> Disposition {
        tracing::debug!(method = %request.method, path = %request.path, "Serving greeting");

        let response = if request.method == Method::HEAD {
            ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", "text/plain")
                .header("Content-Length", GREETING.len().to_string())
                .build()
        } else {
            Response::ok(GREETING)
        };

        Disposition::Respond(response)
    }
}
