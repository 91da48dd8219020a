//! Demo application served by the `rawhttp` binary.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use crate::config::Config;
use crate::http::handler::{Handler, HandlerError};
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;
use crate::proxy::Upstream;

const PROXY_PREFIX: &str = "/httpbin";

const OK_HTML: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

const BAD_REQUEST_HTML: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

const INTERNAL_ERROR_HTML: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";

pub struct DemoHandler {
    upstream: Upstream,
    assets_dir: PathBuf,
}

impl DemoHandler {
    pub fn new(upstream: Upstream, assets_dir: PathBuf) -> Self {
        Self { upstream, assets_dir }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let upstream = Upstream::new(&cfg.upstream_url, cfg.upstream_connect_timeout())?;
        Ok(Self::new(upstream, cfg.assets_dir.clone()))
    }

    async fn proxy<W>(&self, w: ResponseWriter<W>, path: &str) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut upstream = self.upstream.get(path).await.map_err(|e| {
            tracing::warn!(path, error = %e, "upstream request failed");
            HandlerError::internal(format!("upstream request failed: {e}"))
        })?;

        let mut headers = default_headers(0, "text/plain");
        headers.delete("content-length");
        headers.set("transfer-encoding", "chunked");
        headers.set("trailer", "X-Content-SHA256, X-Content-Length");

        let mut body = w
            .write_status_line(StatusCode::Ok)
            .await
            .map_err(write_failed)?
            .write_headers(&headers)
            .await
            .map_err(write_failed)?;

        let mut hasher = Sha256::new();
        let mut total = 0usize;
        loop {
            // No terminating chunk on failure, so the client sees a truncated body.
            let chunk = match upstream.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(path, error = %e, bytes = total, "upstream read failed mid-body");
                    return Err(HandlerError::internal(format!("upstream read failed: {e}")));
                }
            };
            hasher.update(&chunk);
            total += chunk.len();
            body.write_body(&chunk).await.map_err(write_failed)?;
        }

        let mut trailers = Headers::new();
        trailers.set("X-Content-SHA256", format!("{:x}", hasher.finalize()));
        trailers.set("X-Content-Length", total.to_string());
        body.write_trailers(&trailers).await.map_err(write_failed)?;

        tracing::debug!(path, upstream_status = upstream.status, bytes = total, "proxied upstream body");
        Ok(())
    }

    async fn video<W>(&self, w: ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let path = self.assets_dir.join("vim.mp4");
        let video = tokio::fs::read(&path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "video read failed");
            HandlerError::internal("video unavailable")
        })?;

        write_full(w, StatusCode::Ok, "video/mp4", &video).await
    }
}

impl Handler for DemoHandler {
    async fn handle<W>(&self, w: ResponseWriter<W>, request: Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = request.target();

        match target {
            "/yourproblem" => write_html(w, StatusCode::BadRequest, BAD_REQUEST_HTML).await,
            "/myproblem" => write_html(w, StatusCode::InternalServerError, INTERNAL_ERROR_HTML).await,
            t if t.starts_with(PROXY_PREFIX) => self.proxy(w, &t[PROXY_PREFIX.len()..]).await,
            t if t.starts_with("/video") => self.video(w).await,
            _ => write_html(w, StatusCode::Ok, OK_HTML).await,
        }
    }
}

async fn write_html<W>(w: ResponseWriter<W>, status: StatusCode, html: &str) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    write_full(w, status, "text/html", html.as_bytes()).await
}

/// Writes a complete fixed-length response.
async fn write_full<W>(
    w: ResponseWriter<W>,
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let headers = default_headers(body.len(), content_type);
    let mut writer = w
        .write_status_line(status)
        .await
        .map_err(write_failed)?
        .write_headers(&headers)
        .await
        .map_err(write_failed)?;
    writer.write_body(body).await.map_err(write_failed)?;
    writer.finish().await.map_err(write_failed)?;
    Ok(())
}

fn write_failed(e: std::io::Error) -> HandlerError {
    HandlerError::internal(format!("write failed: {e}"))
}
