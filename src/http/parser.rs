use crate::http::body::{ChunkedScanner, RemainingBody};
use crate::http::request::{Method, Request, is_token};

/// Largest request head (request line plus headers) accepted.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidHeader,
    InvalidContentLength,
    InvalidChunk,
    HeadTooLarge,
    Incomplete,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ParseError::InvalidRequest => "invalid request line",
            ParseError::InvalidMethod => "invalid method",
            ParseError::InvalidHeader => "invalid header",
            ParseError::InvalidContentLength => "invalid content-length",
            ParseError::InvalidChunk => "invalid chunked body",
            ParseError::HeadTooLarge => "request head too large",
            ParseError::Incomplete => "incomplete request",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Parses one request head from the front of `buf`.
///
/// Returns [`ParseError::Incomplete`] until the whole head is buffered. The
/// body is never waited for: whatever part of it is already in `buf` is
/// attached to the request, and the returned [`RemainingBody`] says how much
/// more of the stream still belongs to it. The `usize` is the number of
/// bytes of `buf` the request occupied.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize, RemainingBody), ParseError> {
    // Look for header/body separator
    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEAD_SIZE => return Err(ParseError::HeadTooLarge),
        None => return Err(ParseError::Incomplete),
    };
    if headers_end > MAX_HEAD_SIZE {
        return Err(ParseError::HeadTooLarge);
    }

    let header_bytes = &buf[..headers_end];
    let body_start = headers_end + 4;

    let headers_str = std::str::from_utf8(header_bytes).map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split(' ');

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || path.is_empty() || !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    // Headers
    let mut headers = Vec::new();

    for line in lines {
        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

        if !is_token(key) {
            return Err(ParseError::InvalidHeader);
        }

        headers.push((key.to_string(), value.trim().to_string()));
    }

    let mut request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
    };

    // Body framing
    let mut remaining = if request.header("Transfer-Encoding").is_some() {
        if !request.is_chunked() || request.header("Content-Length").is_some() {
            return Err(ParseError::InvalidRequest);
        }
        RemainingBody::Chunked(ChunkedScanner::new())
    } else {
        match content_length(&request)? {
            0 => RemainingBody::Done,
            length => RemainingBody::Length(length),
        }
    };

    let body_len = remaining.advance(&buf[body_start..])?;
    let body_end = body_start + body_len;
    request.body = buf[body_start..body_end].to_vec();

    Ok((request, body_end, remaining))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Declared body length. Repeated Content-Length headers must agree.
fn content_length(request: &Request) -> Result<u64, ParseError> {
    let mut length = None;

    for (_, value) in request
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
    {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength);
        }
        let parsed = value
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidContentLength)?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::InvalidContentLength);
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.unwrap_or(0))
}
