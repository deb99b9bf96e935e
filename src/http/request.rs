use std::fmt;

use crate::http::headers::HeaderStore;

/// HTTP request methods.
///
/// Methods outside this set are rejected by the request-line parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// CONNECT - Open a tunnel
    CONNECT,
    /// TRACE - Loop the request back
    TRACE,
    /// PROPFIND - WebDAV property retrieval
    PROPFIND,
    /// MKCOL - WebDAV collection creation
    MKCOL,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive, as on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use tether::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            "PROPFIND" => Some(Method::PROPFIND),
            "MKCOL" => Some(Method::MKCOL),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
            Method::PROPFIND => "PROPFIND",
            Method::MKCOL => "MKCOL",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request line: `METHOD target HTTP/x.y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Target with any query string removed.
    pub uri: String,
    /// Text after the first `?` of the target, if there was one.
    pub query_string: Option<String>,
    /// Version without the `HTTP/` prefix, e.g. `"1.1"`.
    pub version: String,
}

/// Represents a parsed HTTP request head.
///
/// The body is not part of this type; it is streamed through the
/// connection after the head has been read.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path without query string (e.g., "/index.html")
    pub uri: String,
    /// Query string, without the leading `?`
    pub query_string: Option<String>,
    /// HTTP version without prefix (typically "1.1")
    pub version: String,
    /// Request headers in arrival order
    pub headers: HeaderStore,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<String>,
    query_string: Option<String>,
    version: Option<String>,
    headers: HeaderStore,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            uri: None,
            query_string: None,
            version: None,
            headers: HeaderStore::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the target; a `?` splits off the query string.
    pub fn uri(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        let (uri, query) = split_query(&target);
        self.uri = Some(uri.to_string());
        self.query_string = query.map(str::to_string);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Result<Self, &'static str> {
        self.headers
            .add(key, value)
            .map_err(|_| "too many headers")?;
        Ok(self)
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            uri: self.uri.ok_or("uri missing")?,
            query_string: self.query_string,
            version: self.version.unwrap_or_else(|| "1.1".to_string()),
            headers: self.headers,
        })
    }
}

/// Splits a request target at the first `?`.
pub fn split_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((uri, query)) => (uri, Some(query)),
        None => (target, None),
    }
}

impl Request {
    pub fn from_parts(line: RequestLine, headers: HeaderStore) -> Self {
        Self {
            method: line.method,
            uri: line.uri,
            query_string: line.query_string,
            version: line.version,
            headers,
        }
    }

    /// Retrieves the first header value by name, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get_first_str(key)
    }

    /// Retrieves the Content-Length header value and parses it as a u64.
    ///
    /// Returns `None` if the header is missing or not a valid number.
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Whether the body uses chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    }

    /// The target as it appeared on the request line.
    pub fn target(&self) -> String {
        match &self.query_string {
            Some(q) => format!("{}?{}", self.uri, q),
            None => self.uri.clone(),
        }
    }
}
