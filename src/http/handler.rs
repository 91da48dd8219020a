use std::future::Future;

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;

/// Failure reported by a [`Handler`] before it wrote anything.
///
/// The connection answers with `status` and `message` as a plain-text body.
#[derive(Debug, Error)]
#[error("{status:?}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalServerError, message)
    }
}

/// Application callback invoked once per parsed request.
///
/// The handler owns the response from the status line on. If it returns an
/// error without having written any bytes, the connection writes the error
/// response instead.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        writer: ResponseWriter<W>,
        request: Request,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
