//! tether - embeddable HTTP/1.x protocol core
//!
//! Header parsing, chunked transfer coding, keep-alive policy, URI pattern
//! routing, path sanitizing and log path templates, plus a small tokio
//! server that ties them together.

pub mod config;
pub mod error;
pub mod http;
pub mod logpath;
pub mod net;
pub mod routing;
pub mod server;

pub use error::{Error, Result};
