use std::fmt;

use crate::http::headers::HeaderStore;

/// HTTP status code.
///
/// Any three-digit code can be carried; the associated constants cover the
/// ones the server produces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 201 Created
    pub const CREATED: StatusCode = StatusCode(201);
    /// 204 No Content
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    /// 302 Found
    pub const FOUND: StatusCode = StatusCode(302);
    /// 400 Bad Request
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// 401 Unauthorized
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    /// 404 Not Found
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// 405 Method Not Allowed
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    /// 413 Payload Too Large
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Builds a status code from its numeric value; only 100..=999 is valid.
    pub fn from_u16(code: u16) -> Option<Self> {
        (100..=999).contains(&code).then_some(StatusCode(code))
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tether::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// 4xx or 5xx.
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.0)
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tether::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            206 => "Partial Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed status line: `HTTP/x.y code [reason]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Version without the `HTTP/` prefix.
    pub version: String,
    pub status: StatusCode,
    pub reason: String,
}

/// A response head as received on the client side.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: String,
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderStore,
}

impl ResponseHead {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get_first_str(key)
    }
}

/// One piece of a chunked body. `chunk_size` fixes the size of the next
/// chunk opened while writing `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    pub chunk_size: Option<u64>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Sent with a Content-Length.
    Full(Vec<u8>),
    /// Sent with `Transfer-Encoding: chunked`.
    Chunked(Vec<BodyPart>),
}

impl Body {
    pub fn len(&self) -> usize {
        match self {
            Body::Full(data) => data.len(),
            Body::Chunked(parts) => parts.iter().map(|p| p.data.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Represents a complete HTTP response produced by a handler.
///
/// Contains the HTTP status code, headers, body and any trailers that are
/// to follow a chunked body.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Headers sent in the head
    pub headers: HeaderStore,
    /// Headers added once the head is out; they travel as chunked trailers
    pub trailers: HeaderStore,
    /// Response body
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    trailers: Vec<(String, String)>,
    body: Body,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            trailers: Vec::new(),
            body: Body::Full(Vec::new()),
        }
    }

    /// Adds or replaces a header.
    ///
    /// # Arguments
    ///
    /// * `key` - Header name (case-insensitive in HTTP)
    /// * `value` - Header value
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    /// Adds a trailer header, only meaningful for chunked bodies.
    pub fn trailer(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers.push((key.into(), value.into()));
        self
    }

    /// Sets a fixed-length body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Full(body);
        self
    }

    /// Appends to a chunked body, fixing the size of the next chunk if given.
    pub fn chunk(mut self, chunk_size: Option<u64>, data: impl Into<Vec<u8>>) -> Self {
        let part = BodyPart {
            chunk_size,
            data: data.into(),
        };
        match &mut self.body {
            Body::Chunked(parts) => parts.push(part),
            Body::Full(_) => self.body = Body::Chunked(vec![part]),
        }
        self
    }

    /// Builds the final Response.
    ///
    /// A fixed-length body gets a Content-Length header unless one was set;
    /// a chunked body gets `Transfer-Encoding: chunked` and no Content-Length.
    /// Headers beyond the store capacity are dropped with a warning.
    pub fn build(self) -> Response {
        let mut headers = HeaderStore::new();
        let chunked = matches!(self.body, Body::Chunked(_));

        for (k, v) in &self.headers {
            if chunked && k.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            push_or_warn(&mut headers, k, v);
        }

        match &self.body {
            Body::Full(data) if !headers.contains("Content-Length") => {
                push_or_warn(&mut headers, "Content-Length", &data.len().to_string());
            }
            Body::Chunked(_) if !headers.contains("Transfer-Encoding") => {
                push_or_warn(&mut headers, "Transfer-Encoding", "chunked");
            }
            _ => {}
        }

        let mut trailers = HeaderStore::new();
        for (k, v) in &self.trailers {
            push_or_warn(&mut trailers, k, v);
        }

        Response {
            status: self.status,
            headers,
            trailers,
            body: self.body,
        }
    }
}

fn push_or_warn(store: &mut HeaderStore, key: &str, value: &str) {
    if let Err(e) = store.add(key, value) {
        tracing::warn!(header = key, error = %e, "Dropping response header");
    }
}

impl Response {
    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::OK)
            .body(body.into())
            .build()
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request() -> Self {
        Self::plain(StatusCode::BAD_REQUEST)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::plain(StatusCode::NOT_FOUND)
    }

    /// Creates a 413 response for oversized request heads.
    pub fn payload_too_large() -> Self {
        Self::plain(StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        Self::plain(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn plain(status: StatusCode) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain")
            .body(format!("{} {}", status.as_u16(), status.reason_phrase()).into_bytes())
            .build()
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.body, Body::Chunked(_))
    }
}
