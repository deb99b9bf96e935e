use std::fmt::Write as _;

use crate::http::chunked::ChunkInfo;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::routing::Router;
use crate::server::Handler;

const DEFAULT_CHUNK_SIZE: u64 = 16;
const DEFAULT_CHUNK_COUNT: u64 = 4;
const MAX_CHUNK_COUNT: u64 = 1024;
const MAX_CHUNK_SIZE: u64 = 64 * 1024;

pub fn default_router() -> Router<Handler> {
    Router::new()
        .route("/chunky**", chunky as Handler)
        .route("**", hello as Handler)
}

/// Fixed-length greeting.
pub fn hello(req: &Request) -> Response {
    let body = format!(
        "<html><body><h1>tether</h1><p>{} {}</p></body></html>\n",
        req.method, req.uri
    );
    ResponseBuilder::new(StatusCode::OK)
        .header("Content-Type", "text/html")
        .body(body.into_bytes())
        .build()
}

/// Chunked body of `count` chunks of exactly `size` bytes each, followed by
/// trailers. Both come from the query string (`?size=8&count=3`).
pub fn chunky(req: &Request) -> Response {
    let size = query_param(req, "size")
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_CHUNK_SIZE)
        .min(MAX_CHUNK_SIZE);
    let count = query_param(req, "count")
        .unwrap_or(DEFAULT_CHUNK_COUNT)
        .min(MAX_CHUNK_COUNT);

    let mut builder = ResponseBuilder::new(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Trailer", "X-Chunk-Count, X-Body-Bytes");

    for n in 1..=count {
        let mut text = format!("chunk {n} of {count}");
        text.truncate(size as usize);
        let mut data = text.into_bytes();
        data.resize(size as usize, b'.');
        builder = builder.chunk(Some(size), data);
    }

    builder
        .trailer("X-Chunk-Count", count.to_string())
        .trailer("X-Body-Bytes", (size * count).to_string())
        .build()
}

/// Tags every chunk-size line with its 1-based number.
pub fn chunk_number_extension(info: ChunkInfo, ext: &mut String) -> bool {
    let _ = write!(ext, "n={}", info.chunk_no);
    true
}

fn query_param(req: &Request, key: &str) -> Option<u64> {
    req.query_string
        .as_deref()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
}
