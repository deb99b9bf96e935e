//! HTTP/1.x protocol core.
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: per-connection state machine over any tokio transport,
//!   usable as server or client
//! - **`parser`**: request/status lines and header blocks
//! - **`headers`**: bounded, order-preserving header store
//! - **`request`** / **`response`**: message representations and builders
//! - **`chunked`**: chunked transfer coding in both directions
//! - **`keep_alive`**: connection reuse policy
//! - **`sanitize`**: traversal-safe path canonicalization
//! - **`writer`**: serialization of outgoing heads
//!
//! # Connection State Machine
//!
//! A server connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request head
//!        └──────┬──────┘
//!               │ Request received (400/413 on a bad head)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route and run the handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Head, body, trailers
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → cleanup → Reading (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tether::config::Config;
//! use tether::http::connection::Connection;
//! use tether::server::Service;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::default();
//!     let service = Service::from_config(&cfg);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let mut conn = Connection::new(socket, &cfg)?;
//!         conn.run(&service).await?;
//!     }
//! }
//! ```

pub mod chunked;
pub mod connection;
pub mod headers;
pub mod keep_alive;
pub mod parser;
pub mod request;
pub mod response;
pub mod sanitize;
pub mod writer;
