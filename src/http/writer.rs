use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::response::StatusCode;

const CRLF: &[u8] = b"\r\n";

/// First phase of a response: only the status line can be written.
///
/// Each phase consumes itself and hands back the writer for the next one,
/// so headers can't precede the status line and a body can't precede the
/// headers.
///
/// ```ignore
/// let headers_w = ResponseWriter::new(&mut stream)
///     .write_status_line(StatusCode::Ok)
///     .await?;
/// let mut body = headers_w.write_headers(&default_headers(5, "text/plain")).await?;
/// body.write_body(b"hello").await?;
/// body.finish().await?;
/// ```
pub struct ResponseWriter<W> {
    sink: W,
}

/// Second phase: the header block.
pub struct HeaderWriter<W> {
    sink: W,
}

/// Final phase: the body, either verbatim or as chunks.
pub struct BodyWriter<W> {
    sink: W,
    chunked: bool,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub async fn write_status_line(mut self, status: StatusCode) -> io::Result<HeaderWriter<W>> {
        let line = format!("{}\r\n", status.status_line());
        self.sink.write_all(line.as_bytes()).await?;

        Ok(HeaderWriter { sink: self.sink })
    }
}

impl<W: AsyncWrite + Unpin> HeaderWriter<W> {
    /// Writes every field followed by the blank line ending the header block.
    ///
    /// The body writer switches to chunked mode when `headers` carries
    /// `transfer-encoding: chunked` and no `content-length`.
    pub async fn write_headers(mut self, headers: &Headers) -> io::Result<BodyWriter<W>> {
        write_header_block(&mut self.sink, headers).await?;

        let chunked = !headers.contains("content-length")
            && headers
                .get("transfer-encoding")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("chunked"));

        Ok(BodyWriter {
            sink: self.sink,
            chunked,
        })
    }
}

impl<W: AsyncWrite + Unpin> BodyWriter<W> {
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Writes `body` and returns the number of payload bytes written.
    ///
    /// In chunked mode every call is framed as one chunk; empty writes are
    /// skipped since a zero-length chunk would end the body.
    pub async fn write_body(&mut self, body: &[u8]) -> io::Result<usize> {
        if !self.chunked {
            self.sink.write_all(body).await?;
            return Ok(body.len());
        }

        if body.is_empty() {
            return Ok(0);
        }

        let size_line = format!("{:x}\r\n", body.len());
        self.sink.write_all(size_line.as_bytes()).await?;
        self.sink.write_all(body).await?;
        self.sink.write_all(CRLF).await?;

        Ok(body.len())
    }

    /// Ends a chunked body with the zero-length chunk and a trailer block.
    ///
    /// On a fixed-length body this only flushes.
    pub async fn write_trailers(mut self, trailers: &Headers) -> io::Result<W> {
        if self.chunked {
            self.sink.write_all(b"0\r\n").await?;
            write_header_block(&mut self.sink, trailers).await?;
        }

        self.sink.flush().await?;
        Ok(self.sink)
    }

    /// Completes the response without trailers and returns the sink.
    pub async fn finish(self) -> io::Result<W> {
        self.write_trailers(&Headers::new()).await
    }
}

async fn write_header_block<W: AsyncWrite + Unpin>(sink: &mut W, headers: &Headers) -> io::Result<()> {
    let mut buf = Vec::new();
    for (name, value) in headers.iter() {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }
    buf.extend_from_slice(CRLF);

    sink.write_all(&buf).await
}
