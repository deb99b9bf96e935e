use crate::error::Error;
use crate::http::headers::HeaderStore;
use crate::http::request::{Method, Request, RequestLine, split_query};
use crate::http::response::{ResponseHead, StatusCode, StatusLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The header block is not complete yet; read more bytes and retry.
    Incomplete,
    InvalidRequest,
    InvalidMethod,
    InvalidVersion,
    InvalidStatus,
    TooManyHeaders { limit: usize },
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Incomplete => Error::Malformed("truncated header block"),
            ParseError::InvalidRequest => Error::Malformed("invalid request line"),
            ParseError::InvalidMethod => Error::Malformed("unknown request method"),
            ParseError::InvalidVersion => Error::Malformed("invalid protocol version"),
            ParseError::InvalidStatus => Error::Malformed("invalid status line"),
            ParseError::TooManyHeaders { limit } => Error::CapacityExceeded {
                what: "header count",
                limit,
            },
        }
    }
}

/// Result of scanning a buffer for the end of a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderBlock {
    /// Offset just past the terminating empty line.
    Complete(usize),
    Incomplete,
    /// A control byte showed up where only line text may appear.
    Malformed,
}

/// Finds the end of the head: the first `\r\n\r\n`, or a bare `\n\n`.
///
/// Control bytes other than CR, LF and TAB abort the scan immediately, so
/// a later terminator cannot make a corrupt head look valid. Bytes >= 0x80
/// are allowed.
pub fn scan_for_header_block_end(buf: &[u8]) -> HeaderBlock {
    for (i, &b) in buf.iter().enumerate() {
        if (b < 0x20 && !matches!(b, b'\r' | b'\n' | b'\t')) || b == 0x7f {
            return HeaderBlock::Malformed;
        }
        if b != b'\n' {
            continue;
        }
        match (buf.get(i + 1), buf.get(i + 2)) {
            (Some(b'\n'), _) => return HeaderBlock::Complete(i + 2),
            (Some(b'\r'), Some(b'\n')) => return HeaderBlock::Complete(i + 3),
            _ => {}
        }
    }
    HeaderBlock::Incomplete
}

/// Parses `METHOD target HTTP/x.y`.
///
/// Exactly three whitespace-separated tokens are required. The query string
/// is split off the target at the first `?`.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let mut parts = line.split_ascii_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::InvalidRequest);
    };

    let method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;
    let version = parse_version(version)?;
    let (uri, query) = split_query(target);

    Ok(RequestLine {
        method,
        uri: uri.to_string(),
        query_string: query.map(str::to_string),
        version: version.to_string(),
    })
}

/// Parses `HTTP/x.y code [reason phrase]`.
pub fn parse_status_line(line: &str) -> Result<StatusLine, ParseError> {
    let line = line.trim();
    let (version, rest) = line
        .split_once(|c: char| c.is_ascii_whitespace())
        .ok_or(ParseError::InvalidStatus)?;
    let version = parse_version(version)?;

    let rest = rest.trim_start();
    let (code, reason) = rest
        .split_once(|c: char| c.is_ascii_whitespace())
        .unwrap_or((rest, ""));

    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidStatus);
    }
    let status = code
        .parse::<u16>()
        .ok()
        .and_then(StatusCode::from_u16)
        .ok_or(ParseError::InvalidStatus)?;

    Ok(StatusLine {
        version: version.to_string(),
        status,
        reason: reason.trim().to_string(),
    })
}

/// Strips `HTTP/` and checks the `<major>.<minor>` shape.
fn parse_version(token: &str) -> Result<&str, ParseError> {
    let version = token.strip_prefix("HTTP/").ok_or(ParseError::InvalidVersion)?;
    let (major, minor) = version.split_once('.').ok_or(ParseError::InvalidVersion)?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(major) || !digits(minor) {
        return Err(ParseError::InvalidVersion);
    }
    Ok(version)
}

/// Splits one header line into trimmed name and value.
///
/// A line without `:` is kept as a header whose name is the whole line and
/// whose value is empty. This leniency is long-standing behaviour that
/// callers may rely on; do not tighten it without checking them.
pub fn parse_header_line(line: &[u8]) -> (&[u8], &[u8]) {
    match line.iter().position(|&b| b == b':') {
        Some(colon) => (
            line[..colon].trim_ascii(),
            line[colon + 1..].trim_ascii(),
        ),
        None => (line.trim_ascii(), &[][..]),
    }
}

/// Reads header lines into `headers` until an empty line.
///
/// Returns the number of bytes consumed, including the empty line. Without
/// an empty line the whole input is consumed.
pub fn parse_headers(block: &[u8], headers: &mut HeaderStore) -> Result<usize, ParseError> {
    let mut pos = 0;

    while pos < block.len() {
        let (line, next) = match block[pos..].iter().position(|&b| b == b'\n') {
            Some(n) => (&block[pos..pos + n], pos + n + 1),
            None => (&block[pos..], block.len()),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        pos = next;

        if line.is_empty() {
            break;
        }

        let (name, value) = parse_header_line(line);
        headers
            .add(name, value)
            .map_err(|_| ParseError::TooManyHeaders {
                limit: headers.capacity(),
            })?;
    }

    Ok(pos)
}

/// Splits a complete head into its first line and the header lines.
fn split_first_line(head: &[u8]) -> Result<(&str, &[u8]), ParseError> {
    let end = head
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(ParseError::InvalidRequest)?;
    let line = head[..end].strip_suffix(b"\r").unwrap_or(&head[..end]);
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequest)?;
    Ok((line, &head[end + 1..]))
}

/// Parses a request head from the start of `buf`.
///
/// Returns the request and the number of bytes making up the head; any
/// body bytes that follow are left to the caller.
pub fn parse_http_request(
    buf: &[u8],
    max_headers: usize,
) -> Result<(Request, usize), ParseError> {
    let head_len = match scan_for_header_block_end(buf) {
        HeaderBlock::Complete(n) => n,
        HeaderBlock::Incomplete => return Err(ParseError::Incomplete),
        HeaderBlock::Malformed => return Err(ParseError::InvalidRequest),
    };

    let (line, rest) = split_first_line(&buf[..head_len])?;
    let request_line = parse_request_line(line)?;

    let mut headers = HeaderStore::with_capacity(max_headers);
    parse_headers(rest, &mut headers)?;

    Ok((Request::from_parts(request_line, headers), head_len))
}

/// Parses a response head from the start of `buf`.
pub fn parse_http_response(
    buf: &[u8],
    max_headers: usize,
) -> Result<(ResponseHead, usize), ParseError> {
    let head_len = match scan_for_header_block_end(buf) {
        HeaderBlock::Complete(n) => n,
        HeaderBlock::Incomplete => return Err(ParseError::Incomplete),
        HeaderBlock::Malformed => return Err(ParseError::InvalidStatus),
    };

    let (line, rest) = split_first_line(&buf[..head_len]).map_err(|_| ParseError::InvalidStatus)?;
    let status_line = parse_status_line(line)?;

    let mut headers = HeaderStore::with_capacity(max_headers);
    parse_headers(rest, &mut headers)?;

    Ok((
        ResponseHead {
            version: status_line.version,
            status: status_line.status,
            reason: status_line.reason,
            headers,
        },
        head_len,
    ))
}
