use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::http::headers::HeaderStore;
use crate::http::parser::parse_header_line;

/// Longest chunk-size line or trailer line accepted.
pub const MAX_CHUNK_LINE: usize = 4096;

// 16 hex digits fill a u64.
const MAX_SIZE_DIGITS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    Trailer,
    Done,
}

/// How far one [`ChunkedDecoder::decode`] call got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeProgress {
    /// Input bytes used, framing included.
    pub consumed: usize,
    /// Payload bytes written to the output.
    pub written: usize,
}

/// Incremental chunked transfer-coding decoder.
///
/// Feeds on whatever bytes are at hand and hands back payload only. Size
/// lines, extensions and the final CRLFs are consumed silently; trailer
/// headers are collected for the caller.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: State,
    size: u64,
    size_digits: u8,
    line_len: usize,
    remaining: u64,
    chunk_no: u64,
    line: BytesMut,
    trailers: HeaderStore,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Size,
            size: 0,
            size_digits: 0,
            line_len: 0,
            remaining: 0,
            chunk_no: 0,
            line: BytesMut::new(),
            trailers: HeaderStore::new(),
        }
    }

    /// The zero-size chunk, trailers and final CRLF have all been seen.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Chunks whose size line has been read, the terminating one included.
    pub fn chunk_no(&self) -> u64 {
        self.chunk_no
    }

    pub fn trailers(&self) -> &HeaderStore {
        &self.trailers
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Decodes from `input` into `output` until one of them runs out or the
    /// body ends.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let mut p = DecodeProgress::default();

        while p.consumed < input.len() && self.state != State::Done {
            if self.state == State::Data {
                if p.written == output.len() {
                    break;
                }
                let n = usize::try_from(self.remaining)
                    .unwrap_or(usize::MAX)
                    .min(input.len() - p.consumed)
                    .min(output.len() - p.written);
                output[p.written..p.written + n]
                    .copy_from_slice(&input[p.consumed..p.consumed + n]);
                p.consumed += n;
                p.written += n;
                self.remaining -= n as u64;
                if self.remaining == 0 {
                    self.state = State::DataCr;
                }
                continue;
            }

            let b = input[p.consumed];
            p.consumed += 1;
            self.step(b)?;
        }

        Ok(p)
    }

    /// Decodes everything available in `input`, appending payload to `out`.
    /// Returns the number of input bytes consumed.
    pub fn decode_into(&mut self, input: &[u8], out: &mut BytesMut) -> Result<usize> {
        let mut consumed = 0;
        let mut scratch = [0u8; 4096];
        loop {
            let p = self.decode(&input[consumed..], &mut scratch)?;
            out.extend_from_slice(&scratch[..p.written]);
            consumed += p.consumed;
            if p.consumed == 0 {
                return Ok(consumed);
            }
        }
    }

    fn step(&mut self, b: u8) -> Result<()> {
        match self.state {
            State::Size => {
                self.bump_line()?;
                if let Some(d) = hex_value(b) {
                    if self.size_digits == MAX_SIZE_DIGITS {
                        return Err(Error::Malformed("chunk size overflows"));
                    }
                    self.size = (self.size << 4) | u64::from(d);
                    self.size_digits += 1;
                    return Ok(());
                }
                if self.size_digits == 0 {
                    return Err(Error::Malformed("missing chunk size"));
                }
                match b {
                    b';' | b' ' | b'\t' => self.state = State::Extension,
                    b'\r' => self.state = State::SizeLf,
                    b'\n' => self.end_size_line(),
                    _ => return Err(Error::Malformed("invalid chunk size")),
                }
            }
            State::Extension => {
                self.bump_line()?;
                match b {
                    b'\r' => self.state = State::SizeLf,
                    b'\n' => self.end_size_line(),
                    _ => {}
                }
            }
            State::SizeLf => {
                if b != b'\n' {
                    return Err(Error::Malformed("chunk size line not terminated"));
                }
                self.end_size_line();
            }
            State::DataCr => match b {
                b'\r' => self.state = State::DataLf,
                b'\n' => self.state = State::Size,
                _ => return Err(Error::Malformed("chunk data not followed by CRLF")),
            },
            State::DataLf => {
                if b != b'\n' {
                    return Err(Error::Malformed("chunk data not followed by CRLF"));
                }
                self.state = State::Size;
            }
            State::Trailer => {
                if b != b'\n' {
                    if self.line.len() >= MAX_CHUNK_LINE {
                        return Err(Error::CapacityExceeded {
                            what: "trailer line",
                            limit: MAX_CHUNK_LINE,
                        });
                    }
                    self.line.extend_from_slice(&[b]);
                    return Ok(());
                }
                let line = self.line.split();
                let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
                if line.is_empty() {
                    self.state = State::Done;
                } else {
                    let (name, value) = parse_header_line(line);
                    self.trailers.add(name, value)?;
                }
            }
            // payload bytes never reach here
            State::Data | State::Done => {}
        }
        Ok(())
    }

    fn bump_line(&mut self) -> Result<()> {
        self.line_len += 1;
        if self.line_len > MAX_CHUNK_LINE {
            return Err(Error::CapacityExceeded {
                what: "chunk size line",
                limit: MAX_CHUNK_LINE,
            });
        }
        Ok(())
    }

    fn end_size_line(&mut self) {
        self.chunk_no += 1;
        self.remaining = self.size;
        self.state = if self.size == 0 {
            State::Trailer
        } else {
            State::Data
        };
        self.size = 0;
        self.size_digits = 0;
        self.line_len = 0;
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
