//! Chunked transfer coding.
//!
//! Wire format:
//!
//! ```text
//! <hex-size>[;ext]\r\n<payload>\r\n   repeated
//! 0\r\n[trailer: value\r\n]*\r\n       terminator
//! ```

pub mod decoder;
pub mod encoder;

pub use decoder::{ChunkedDecoder, DecodeProgress};
pub use encoder::{ChunkInfo, ChunkedEncoder, DEFAULT_AUTO_CHUNK_SIZE, ExtensionHook};
