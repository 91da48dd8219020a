use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::handler::Handler;
use crate::http::parser::RequestReader;

/// Pause after an accept error that is not tied to a single connection,
/// such as running out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of incoming connections.
trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Binds `cfg.listen_addr` and serves until `shutdown` flips to `true`.
pub async fn run<H: Handler>(cfg: &Config, handler: H, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, cfg.request_reader(), Arc::new(handler), shutdown).await
}

/// Accepts connections on an already bound listener, one task per
/// connection.
///
/// Accept errors are logged and the loop keeps going. Once `shutdown` fires
/// the listener is dropped and in-flight connections are awaited; they are
/// never cancelled.
pub async fn serve<H: Handler>(
    listener: TcpListener,
    reader: RequestReader,
    handler: Arc<H>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    accept_loop(listener, reader, handler, shutdown).await;
    Ok(())
}

async fn accept_loop<A, H>(mut listener: A, reader: RequestReader, handler: Arc<H>, mut shutdown: watch::Receiver<bool>)
where
    A: Accept,
    H: Handler,
{
    let mut connections = JoinSet::new();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            changed = shutdown.changed() => {
                // A dropped sender counts as a shutdown request.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let (socket, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                if !is_connection_error(&e) {
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let handler = Arc::clone(&handler);
        connections.spawn(async move {
            let mut conn = Connection::new(socket, peer, reader);
            if let Err(e) = conn.run(handler.as_ref()).await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });

        // Reap finished connections so the set doesn't grow without bound.
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    info!(in_flight = connections.len(), "Stopped accepting connections");

    while connections.join_next().await.is_some() {}
}

/// Errors that only concern the connection being accepted.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}
