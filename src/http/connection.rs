use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::handler::{Handler, HandlerError};
use crate::http::parser::{ParseError, RequestReader};
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;

/// Serves exactly one request over a stream, then closes it.
pub struct Connection<S> {
    stream: Counted<S>,
    peer: SocketAddr,
    reader: RequestReader,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr, reader: RequestReader) -> Self {
        Self {
            stream: Counted::new(stream),
            peer,
            reader,
        }
    }

    /// Reads the request, runs `handler`, and shuts the stream down.
    ///
    /// Parse and handler failures are answered with a best-effort error
    /// response; only transport errors are returned.
    pub async fn run<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        let result = self.serve(handler).await;

        if let Err(e) = self.stream.inner.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "shutdown failed");
        }

        result
    }

    async fn serve<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        let request = match self.reader.read_request(&mut self.stream.inner).await {
            Ok(request) => request,
            Err(ParseError::Io(e)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "rejecting request");
                // The client may already be gone (e.g. after an incomplete request).
                if let Err(write_err) = self.write_error(StatusCode::BadRequest, &e.to_string()).await {
                    tracing::debug!(peer = %self.peer, error = %write_err, "could not send 400");
                }
                return Ok(());
            }
        };

        tracing::debug!(
            peer = %self.peer,
            method = %request.line.method,
            target = %request.line.target,
            body_len = request.body.len(),
            "request parsed"
        );

        let outcome = handler
            .handle(ResponseWriter::new(&mut self.stream), request)
            .await;

        if let Err(HandlerError { status, message }) = outcome {
            if self.stream.written == 0 {
                tracing::warn!(peer = %self.peer, status = status.as_u16(), reason = %message, "handler failed");
                self.write_error(status, &message).await?;
            } else {
                tracing::error!(
                    peer = %self.peer,
                    reason = %message,
                    written = self.stream.written,
                    "handler failed after the response started"
                );
            }
        }

        Ok(())
    }

    async fn write_error(&mut self, status: StatusCode, message: &str) -> io::Result<()> {
        let body = format!("{}\n", message);
        let headers = default_headers(body.len(), "text/plain");

        let mut writer = ResponseWriter::new(&mut self.stream)
            .write_status_line(status)
            .await?
            .write_headers(&headers)
            .await?;
        writer.write_body(body.as_bytes()).await?;
        writer.finish().await?;
        Ok(())
    }
}

/// Write half wrapper that counts bytes accepted by the inner stream.
struct Counted<S> {
    inner: S,
    written: usize,
}

impl<S> Counted<S> {
    fn new(inner: S) -> Self {
        Self { inner, written: 0 }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Counted<S> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written += n;
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
