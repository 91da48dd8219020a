//! Upstream streaming for proxied routes
//!
//! Connects to a plain-HTTP upstream and exposes its response body as a
//! sequence of reads, so callers can relay it as chunks.

pub mod upstream;

pub use upstream::{Upstream, UpstreamBody};
