//! Finding where a request body ends while its bytes stream past.
//!
//! The relay never holds a whole body. Once the head is parsed it only
//! tracks how much more of the stream belongs to the current request, so
//! exactly those bytes are forwarded.

use crate::http::parser::ParseError;

/// Longest chunk-size or trailer line accepted.
const MAX_LINE: usize = 4096;

/// The part of a request body that has not been seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemainingBody {
    /// Nothing more belongs to the request.
    Done,
    /// Exactly this many more bytes follow.
    Length(u64),
    /// A chunked body that has not reached its last chunk yet.
    Chunked(ChunkedScanner),
}

impl RemainingBody {
    pub fn is_done(&self) -> bool {
        matches!(self, RemainingBody::Done)
    }

    /// Largest read, capped at `max`, that cannot run past the body.
    pub fn read_limit(&self, max: usize) -> usize {
        match self {
            RemainingBody::Done => 0,
            RemainingBody::Length(left) => usize::try_from(*left).map_or(max, |left| left.min(max)),
            RemainingBody::Chunked(_) => max,
        }
    }

    /// Accounts for `bytes` arriving next on the stream and returns how many
    /// of them belong to the body. Anything past that is the next message.
    pub fn advance(&mut self, bytes: &[u8]) -> Result<usize, ParseError> {
        let (used, finished) = match self {
            RemainingBody::Done => (0, true),
            RemainingBody::Length(left) => {
                let used = usize::try_from(*left).map_or(bytes.len(), |l| l.min(bytes.len()));
                *left -= used as u64;
                (used, *left == 0)
            }
            RemainingBody::Chunked(scanner) => match scanner.feed(bytes)? {
                Some(end) => (end, true),
                None => (bytes.len(), false),
            },
        };

        if finished {
            *self = RemainingBody::Done;
        }
        Ok(used)
    }
}

/// Incremental scanner for `Transfer-Encoding: chunked` framing.
///
/// Bytes are only inspected, never decoded: the relay forwards the chunk
/// framing as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedScanner {
    state: ChunkState,
    line: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ChunkState {
    #[default]
    Size,
    Data(u64),
    DataEnd,
    Trailer,
}

impl ChunkedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next body bytes.
    ///
    /// Returns the offset just past the final CRLF once the body ends, or
    /// `None` if every byte of `bytes` belongs to the body.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<usize>, ParseError> {
        let mut pos = 0;

        while pos < bytes.len() {
            if let ChunkState::Data(left) = self.state {
                let available = bytes.len() - pos;
                let take = usize::try_from(left).map_or(available, |l| l.min(available));
                pos += take;

                let left = left - take as u64;
                self.state = if left == 0 {
                    ChunkState::DataEnd
                } else {
                    ChunkState::Data(left)
                };
                continue;
            }

            let byte = bytes[pos];
            pos += 1;

            if byte != b'\n' {
                if self.line.len() >= MAX_LINE {
                    return Err(ParseError::InvalidChunk);
                }
                self.line.push(byte);
                continue;
            }

            let line = std::mem::take(&mut self.line);
            let line = line.strip_suffix(b"\r").ok_or(ParseError::InvalidChunk)?;
            if self.finish_line(line)? {
                return Ok(Some(pos));
            }
        }

        Ok(None)
    }

    /// Handles one complete line. Returns true at the end of the trailers.
    fn finish_line(&mut self, line: &[u8]) -> Result<bool, ParseError> {
        match self.state {
            ChunkState::Size => {
                self.state = match parse_chunk_size(line)? {
                    0 => ChunkState::Trailer,
                    size => ChunkState::Data(size),
                };
                Ok(false)
            }
            ChunkState::DataEnd if line.is_empty() => {
                self.state = ChunkState::Size;
                Ok(false)
            }
            ChunkState::Trailer => Ok(line.is_empty()),
            ChunkState::DataEnd | ChunkState::Data(_) => Err(ParseError::InvalidChunk),
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidChunk)?;
    let size = line.split(';').next().unwrap_or("").trim();

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidChunk);
    }
    u64::from_str_radix(size, 16).map_err(|_| ParseError::InvalidChunk)
}
