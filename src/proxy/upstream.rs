//! Upstream connections for streamed proxy responses
//!
//! The demo application forwards `/httpbin/*` to a plain-HTTP upstream and
//! relays the body as it arrives, without buffering it all first.

use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::http::headers::find_crlf;

/// Read size for the upstream body
const BUFFER_SIZE: usize = 8192;

/// Cap on the upstream response head
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// A plain-HTTP upstream server.
#[derive(Debug, Clone)]
pub struct Upstream {
    base: url::Url,
    connect_timeout: Duration,
}

/// Body of an upstream response, read on demand.
pub struct UpstreamBody {
    stream: TcpStream,
    /// Body bytes that arrived together with the response head
    pending: Option<Bytes>,
    /// Upstream status code, for logging
    pub status: u16,
}

impl Upstream {
    pub fn new(base: &str, connect_timeout: Duration) -> Result<Self> {
        let base = url::Url::parse(base).context("Invalid upstream URL")?;
        anyhow::ensure!(base.scheme() == "http", "Only http:// upstreams are supported");
        base.host_str().context("Upstream URL missing host")?;

        Ok(Self { base, connect_timeout })
    }

    /// Issues `GET <base><path>` and returns once the response head is read.
    ///
    /// The request is sent as HTTP/1.0 so the upstream replies with an
    /// identity body that ends when it closes the connection.
    pub async fn get(&self, path: &str) -> Result<UpstreamBody> {
        let host = self.base.host_str().context("Upstream URL missing host")?;
        let port = self.base.port_or_known_default().unwrap_or(80);

        let addr = format!("{}:{}", host, port);
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to upstream")?;

        tracing::trace!(upstream = %addr, "Connected to upstream");

        let request = self.build_request(path);
        stream.write_all(&request).await?;
        stream.flush().await?;

        let (status, pending) = read_head(&mut stream).await?;
        tracing::debug!(upstream = %addr, path, status, "Upstream responded");

        Ok(UpstreamBody {
            stream,
            pending: (!pending.is_empty()).then_some(pending),
            status,
        })
    }

    /// Request bytes for `path`, joined onto the base URL's path.
    pub fn build_request(&self, path: &str) -> Vec<u8> {
        let base_path = self.base.path().trim_end_matches('/');
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let target = match format!("{}{}", base_path, path) {
            t if t.is_empty() => "/".to_string(),
            t => t,
        };

        let host = match (self.base.host_str(), self.base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\nUser-Agent: rawhttp\r\n\r\n",
            target, host
        )
        .into_bytes()
    }
}

impl UpstreamBody {
    /// Returns the next piece of the body, or `None` once the upstream
    /// closes the connection.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }

        let mut buf = BytesMut::with_capacity(BUFFER_SIZE);
        let n = self.stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }
}

/// Reads up to the end of the response head and returns the status code and
/// any body bytes already received.
async fn read_head(stream: &mut TcpStream) -> Result<(u16, Bytes)> {
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            anyhow::bail!("Connection closed before complete response head received");
        }

        if let Some(head_end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = buffer.split_to(head_end + 4);
            let status = parse_status(&head)?;
            return Ok((status, buffer.freeze()));
        }

        if buffer.len() > MAX_HEAD_SIZE {
            anyhow::bail!("Response headers too large");
        }
    }
}

fn parse_status(head: &[u8]) -> Result<u16> {
    let line_end = find_crlf(head).context("Empty response")?;
    let status_line = std::str::from_utf8(&head[..line_end]).context("Invalid UTF-8 in status line")?;

    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    anyhow::ensure!(version.starts_with("HTTP/"), "Invalid status line: {}", status_line);

    parts
        .next()
        .context("Status line missing code")?
        .parse()
        .context("Invalid status code")
}
