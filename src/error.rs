//! Error types shared by the protocol core.

use std::io;

/// Failures surfaced by the protocol core.
///
/// Needing more bytes is not represented here: header scanning reports
/// [`HeaderBlock::Incomplete`](crate::http::parser::HeaderBlock) and the
/// connection loop keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structurally invalid request/status line, header block or chunk frame.
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// Header store or configured buffer cap exhausted. The transport should
    /// be closed.
    #[error("capacity exceeded: {what} (limit {limit})")]
    CapacityExceeded { what: &'static str, limit: usize },

    /// Endpoint token that is not `[[ipv4]:]port[s]`.
    #[error("invalid endpoint {token:?}: {reason}")]
    AddressParse { token: String, reason: &'static str },

    /// A header was added after a head that cannot carry trailers.
    #[error("header {0:?} added after the head was sent on a non-chunked body")]
    HeadAlreadySent(String),

    /// The body was finished while an explicitly sized chunk was still short.
    #[error("chunk still expects {remaining} bytes")]
    ChunkUnderrun { remaining: u64 },

    #[error("invalid configuration value for {key:?}: {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn address(token: &str, reason: &'static str) -> Self {
        Error::AddressParse {
            token: token.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
