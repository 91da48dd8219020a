use std::io;
use std::mem;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::buffer::ReadBuffer;
use crate::http::headers::{HeaderError, Headers};
use crate::http::request::{Request, RequestLine, parse_request_line};

const CONTENT_LENGTH: &str = "content-length";

pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("invalid method: {0:?}")]
    InvalidMethod(String),
    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),
    #[error("body is longer than content-length: received {received}, declared {declared}")]
    BodyOverflow { declared: usize, received: usize },
    #[error("connection closed before the request was complete")]
    IncompleteRequest,
    #[error("parser already finished")]
    ParserFinished,
    #[error("unparsed request data exceeds {0} bytes")]
    RequestTooLarge(usize),
    #[error("declared body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Externally visible progress of a [`RequestParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// Parser state; each phase owns exactly the data collected so far.
#[derive(Debug)]
enum Phase {
    RequestLine,
    Headers {
        line: RequestLine,
        headers: Headers,
    },
    Body {
        line: RequestLine,
        headers: Headers,
        body: Vec<u8>,
    },
    Done(Request),
}

/// Incremental HTTP/1.1 request parser.
///
/// Feed it the unconsumed bytes of a read buffer with [`RequestParser::parse`];
/// it reports how many bytes it accepted and keeps whatever it has parsed so
/// far. Bytes it did not accept must be offered again, together with more
/// data, on the next call.
#[derive(Debug)]
pub struct RequestParser {
    phase: Phase,
    max_body_size: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_max_body_size(usize::MAX)
    }

    /// A parser that rejects any `content-length` above `limit` before
    /// buffering the body.
    pub fn with_max_body_size(limit: usize) -> Self {
        Self {
            phase: Phase::RequestLine,
            max_body_size: limit,
        }
    }

    pub fn state(&self) -> RequestState {
        match self.phase {
            Phase::RequestLine => RequestState::Initialized,
            Phase::Headers { .. } => RequestState::ParsingHeaders,
            Phase::Body { .. } => RequestState::ParsingBody,
            Phase::Done(_) => RequestState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// Returns the request once parsing is done.
    pub fn finish(self) -> Option<Request> {
        match self.phase {
            Phase::Done(request) => Some(request),
            _ => None,
        }
    }

    /// Parses as much of `data` as possible, stepping through every state
    /// transition the available bytes allow.
    ///
    /// Returns the number of bytes consumed. Any error is fatal: the parser
    /// must not be used again.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.is_done() {
            return Err(ParseError::ParserFinished);
        }

        let mut total = 0;
        while !self.is_done() {
            let before = self.state();
            let n = self.parse_single(&data[total..])?;
            total += n;

            if n == 0 && self.state() == before {
                break;
            }
        }

        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match &mut self.phase {
            Phase::RequestLine => {
                let Some((line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                tracing::trace!(method = %line.method, target = %line.target, "parsed request line");
                self.phase = Phase::Headers {
                    line,
                    headers: Headers::new(),
                };
                Ok(n)
            }

            Phase::Headers { headers, .. } => {
                let (n, finished) = headers.parse_one(data)?;
                if finished {
                    self.phase = match mem::replace(&mut self.phase, Phase::RequestLine) {
                        Phase::Headers { line, headers } => Phase::Body {
                            line,
                            headers,
                            body: Vec::new(),
                        },
                        other => other,
                    };
                }
                Ok(n)
            }

            Phase::Body { headers, body, .. } => {
                let declared = match headers.get_int(CONTENT_LENGTH) {
                    Ok(len) => Some(len),
                    Err(HeaderError::NotFound(_)) => None,
                    Err(_) => {
                        let raw = headers.get(CONTENT_LENGTH).unwrap_or_default();
                        return Err(ParseError::InvalidContentLength(raw.to_string()));
                    }
                };

                let consumed = match declared {
                    None => 0,
                    Some(declared) if declared > self.max_body_size => {
                        return Err(ParseError::BodyTooLarge {
                            declared,
                            limit: self.max_body_size,
                        });
                    }
                    Some(declared) => {
                        let received = body.len() + data.len();
                        if received > declared {
                            return Err(ParseError::BodyOverflow { declared, received });
                        }
                        body.extend_from_slice(data);
                        if body.len() < declared {
                            return Ok(data.len());
                        }
                        data.len()
                    }
                };

                self.phase = match mem::replace(&mut self.phase, Phase::RequestLine) {
                    Phase::Body { line, headers, body } => Phase::Done(Request { line, headers, body }),
                    other => other,
                };
                Ok(consumed)
            }

            Phase::Done(_) => Err(ParseError::ParserFinished),
        }
    }
}

/// Drives a [`RequestParser`] over an async byte source.
#[derive(Debug, Clone, Copy)]
pub struct RequestReader {
    initial_capacity: usize,
    max_buffer_size: usize,
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new(DEFAULT_READ_BUFFER_SIZE, DEFAULT_MAX_BUFFER_SIZE)
    }
}

impl RequestReader {
    pub fn new(initial_capacity: usize, max_buffer_size: usize) -> Self {
        Self {
            initial_capacity: initial_capacity.max(1),
            max_buffer_size: max_buffer_size.max(1),
        }
    }

    /// Reads exactly one request from `reader`.
    ///
    /// `max_buffer_size` also bounds the declared body length.
    ///
    /// The source reaching end of stream before the request is complete is
    /// an error, not an empty request.
    pub async fn read_request<R>(&self, reader: &mut R) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let mut parser = RequestParser::with_max_body_size(self.max_buffer_size);
        let mut buf = ReadBuffer::with_capacity(self.initial_capacity.min(self.max_buffer_size));

        while !parser.is_done() {
            if !buf.reserve_within(self.max_buffer_size) {
                return Err(ParseError::RequestTooLarge(self.max_buffer_size));
            }

            let n = reader.read(buf.spare_mut()).await?;
            buf.advance(n);

            let consumed = parser.parse(buf.filled())?;
            buf.consume(consumed);

            if parser.is_done() {
                break;
            }

            if n == 0 {
                return Err(ParseError::IncompleteRequest);
            }
        }

        parser.finish().ok_or(ParseError::IncompleteRequest)
    }
}

/// Reads one request with the default buffer settings.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    RequestReader::default().read_request(reader).await
}
