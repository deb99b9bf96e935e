//! TCP server built on [`Connection`](crate::http::connection::Connection).

pub mod access_log;
pub mod listener;
pub mod routes;

use crate::config::Config;
use crate::http::chunked::ChunkInfo;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::Router;

pub use access_log::AccessLog;

/// Request handler. Handlers are plain functions so a route table can be
/// shared across connections without locking.
pub type Handler = fn(&Request) -> Response;

/// Chunk extension hook installed on every connection.
pub type ChunkExtension = fn(ChunkInfo, &mut String) -> bool;

/// Everything a connection needs to serve requests.
#[derive(Debug)]
pub struct Service {
    pub router: Router<Handler>,
    pub access_log: Option<AccessLog>,
    pub chunk_extension: Option<ChunkExtension>,
}

impl Service {
    pub fn new(router: Router<Handler>) -> Self {
        Self {
            router,
            access_log: None,
            chunk_extension: None,
        }
    }

    /// The demo routes plus whatever the configuration enables.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            router: routes::default_router(),
            access_log: cfg.access_log_path().map(AccessLog::new),
            chunk_extension: Some(routes::chunk_number_extension),
        }
    }
}
