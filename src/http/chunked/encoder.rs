use std::fmt::Write as _;

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::http::headers::HeaderStore;

/// Default size of the auto-chunking accumulation buffer.
pub const DEFAULT_AUTO_CHUNK_SIZE: usize = 4096;

/// What an extension hook gets to see about the chunk being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// 1-based number of the chunk.
    pub chunk_no: u64,
    pub size: u64,
}

/// Called before every chunk-size line is written.
///
/// The hook may write extension text into the `String`. Returning `true`
/// lets the encoder write the standard `size;ext` line. Returning `false`
/// means the hook wrote the complete size line itself (without CRLF); an
/// empty line is ignored and the standard one is written instead.
pub type ExtensionHook = Box<dyn FnMut(ChunkInfo, &mut String) -> bool + Send>;

/// Chunked transfer-coding encoder.
///
/// Framed bytes are appended to a caller-owned buffer. Chunks are either
/// sized explicitly with [`set_next_chunk_size`](Self::set_next_chunk_size)
/// or cut automatically whenever the internal accumulation buffer fills.
pub struct ChunkedEncoder {
    chunk_no: u64,
    remaining: u64,
    next_chunk_size: u64,
    pending: BytesMut,
    auto_chunk_size: usize,
    trailers: HeaderStore,
    extension: Option<ExtensionHook>,
    finished: bool,
}

impl std::fmt::Debug for ChunkedEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncoder")
            .field("chunk_no", &self.chunk_no)
            .field("remaining", &self.remaining)
            .field("next_chunk_size", &self.next_chunk_size)
            .field("pending", &self.pending.len())
            .field("trailers", &self.trailers.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_CHUNK_SIZE)
    }
}

impl ChunkedEncoder {
    pub fn new(auto_chunk_size: usize) -> Self {
        let auto_chunk_size = auto_chunk_size.max(1);
        Self {
            chunk_no: 0,
            remaining: 0,
            next_chunk_size: 0,
            pending: BytesMut::with_capacity(auto_chunk_size),
            auto_chunk_size,
            trailers: HeaderStore::new(),
            extension: None,
            finished: false,
        }
    }

    pub fn with_extension_hook(mut self, hook: ExtensionHook) -> Self {
        self.extension = Some(hook);
        self
    }

    pub fn set_extension_hook(&mut self, hook: Option<ExtensionHook>) {
        self.extension = hook;
    }

    /// Fixes the size of the next chunk to be opened. 0 means auto-chunk.
    /// Has no effect on a chunk that is already open.
    pub fn set_next_chunk_size(&mut self, size: u64) {
        self.next_chunk_size = size;
    }

    /// Bytes still owed to the explicitly sized chunk that is open, or 0.
    pub fn remaining_chunk_size(&self) -> u64 {
        self.remaining
    }

    /// Number of chunk-size lines written so far.
    pub fn chunk_no(&self) -> u64 {
        self.chunk_no
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn add_trailer(&mut self, name: &str, value: &str) -> Result<()> {
        self.trailers.add(name, value)
    }

    pub fn trailers(&self) -> &HeaderStore {
        &self.trailers
    }

    /// Frames `data` into `out`.
    pub fn write(&mut self, mut data: &[u8], out: &mut BytesMut) -> Result<()> {
        if self.finished {
            return Err(Error::Malformed("write after the final chunk"));
        }

        while !data.is_empty() {
            if self.remaining > 0 {
                let n = self.remaining.min(data.len() as u64) as usize;
                out.extend_from_slice(&data[..n]);
                self.remaining -= n as u64;
                data = &data[n..];
                if self.remaining == 0 {
                    out.extend_from_slice(b"\r\n");
                }
                continue;
            }

            if self.next_chunk_size > 0 {
                self.flush(out);
                let size = std::mem::take(&mut self.next_chunk_size);
                self.open_chunk(size, out);
                self.remaining = size;
                continue;
            }

            let room = self.auto_chunk_size - self.pending.len();
            let n = room.min(data.len());
            self.pending.extend_from_slice(&data[..n]);
            data = &data[n..];
            if self.pending.len() >= self.auto_chunk_size {
                self.flush(out);
            }
        }

        Ok(())
    }

    /// Emits any accumulated auto-chunk data as one chunk.
    pub fn flush(&mut self, out: &mut BytesMut) {
        if self.pending.is_empty() {
            return;
        }
        let data = self.pending.split();
        self.open_chunk(data.len() as u64, out);
        out.extend_from_slice(&data);
        out.extend_from_slice(b"\r\n");
    }

    /// Writes the zero-size chunk and any trailers.
    ///
    /// Fails while an explicitly sized chunk is still short of bytes. Calling
    /// it again once finished does nothing.
    pub fn finish(&mut self, out: &mut BytesMut) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.remaining > 0 {
            return Err(Error::ChunkUnderrun {
                remaining: self.remaining,
            });
        }

        self.flush(out);
        out.extend_from_slice(b"0\r\n");
        for entry in &self.trailers {
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(b": ");
            out.extend_from_slice(&entry.value);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        self.finished = true;

        tracing::trace!(
            chunks = self.chunk_no,
            trailers = self.trailers.len(),
            "Chunked body finished"
        );
        Ok(())
    }

    /// Clears all per-body state; the extension hook and chunk size limit stay.
    pub fn reset(&mut self) {
        self.chunk_no = 0;
        self.remaining = 0;
        self.next_chunk_size = 0;
        self.pending.clear();
        self.trailers.clear();
        self.finished = false;
    }

    fn open_chunk(&mut self, size: u64, out: &mut BytesMut) {
        self.chunk_no += 1;

        let mut ext = String::new();
        let info = ChunkInfo {
            chunk_no: self.chunk_no,
            size,
        };
        let run_default = match self.extension.as_mut() {
            Some(hook) => hook(info, &mut ext),
            None => true,
        };

        let mut line = String::new();
        if run_default || ext.is_empty() {
            let _ = write!(line, "{:x}", size);
            if !ext.is_empty() {
                if !ext.starts_with(';') {
                    line.push(';');
                }
                line.push_str(&ext);
            }
        } else {
            line = ext;
        }

        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}
