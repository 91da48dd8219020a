//! rawhttp - HTTP/1.1 over raw TCP
//!
//! Incremental request parsing, an ordered header collection, and a
//! type-state response writer with chunked bodies and trailers, plus the
//! small server and demo application built on them.

pub mod app;
pub mod config;
pub mod http;
pub mod proxy;
pub mod server;
