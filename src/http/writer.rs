use bytes::BytesMut;

use crate::http::headers::HeaderStore;
use crate::http::request::Method;
use crate::http::response::StatusCode;

/// Protocol version written on outgoing heads.
pub const HTTP_VERSION: &str = "HTTP/1.1";

fn put_headers(headers: &HeaderStore, skip: &[&str], buf: &mut BytesMut) {
    for entry in headers {
        if skip.iter().any(|s| entry.name.eq_ignore_ascii_case(s.as_bytes())) {
            continue;
        }
        buf.extend_from_slice(&entry.name);
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(&entry.value);
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");
}

/// Status line, headers and the blank line. Headers named in `skip` are
/// left out.
pub fn serialize_response_head(
    status: StatusCode,
    headers: &HeaderStore,
    skip: &[&str],
    buf: &mut BytesMut,
) {
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());
    put_headers(headers, skip, buf);
}

/// Request line, headers and the blank line.
pub fn serialize_request_head(
    method: Method,
    target: &str,
    headers: &HeaderStore,
    skip: &[&str],
    buf: &mut BytesMut,
) {
    let target = if target.is_empty() { "/" } else { target };
    let request_line = format!("{} {} {}\r\n", method, target, HTTP_VERSION);
    buf.extend_from_slice(request_line.as_bytes());
    put_headers(headers, skip, buf);
}
