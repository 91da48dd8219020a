//! HTTP/1.1 protocol implementation over raw byte streams.
//!
//! # Architecture
//!
//! - **`headers`**: Ordered, case-insensitive header collection and the single-line header parser
//! - **`request`**: Request line parsing and the parsed request type
//! - **`buffer`**: Growable read buffer used by the request reader
//! - **`parser`**: Incremental request state machine and the read loop driving it
//! - **`response`**: Status codes and default response headers
//! - **`writer`**: Type-state response writer, including chunked bodies with trailers
//! - **`handler`**: The application callback boundary
//! - **`connection`**: Serves one request per connection
//!
//! # Request State Machine
//!
//! ```text
//!        ┌─────────────────┐
//!        │   Initialized   │ ← Waiting for the request line
//!        └────────┬────────┘
//!                 │ request line parsed
//!                 ▼
//!        ┌─────────────────┐
//!        │ ParsingHeaders  │ ← One header line per step
//!        └────────┬────────┘
//!                 │ blank line
//!                 ▼
//!        ┌─────────────────┐
//!        │   ParsingBody   │ ← Up to content-length bytes
//!        └────────┬────────┘
//!                 │ body complete (or no content-length)
//!                 ▼
//!        ┌─────────────────┐
//!        │      Done       │
//!        └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rawhttp::http::parser::read_request;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     let (mut socket, _addr) = listener.accept().await?;
//!     let request = read_request(&mut socket).await?;
//!     println!("{} {}", request.line.method, request.line.target);
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod connection;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
