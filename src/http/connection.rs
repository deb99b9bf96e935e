use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use bytes::{Buf, BytesMut};
use chrono::Local;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::chunked::{ChunkedDecoder, ChunkedEncoder, ExtensionHook};
use crate::http::headers::HeaderStore;
use crate::http::keep_alive;
use crate::http::parser::{ParseError, parse_http_request, parse_http_response};
use crate::http::request::{Method, Request};
use crate::http::response::{Body, Response, ResponseHead};
use crate::http::sanitize::sanitize_path_str;
use crate::http::writer::{serialize_request_head, serialize_response_head};
use crate::logpath::LogContext;
use crate::server::Service;

const READ_CHUNK: usize = 4096;

/// How the incoming body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxBody {
    Length(u64),
    Chunked,
    UntilClose,
    Done,
}

/// Per-transaction state. Reset, not rebuilt, between requests on a
/// kept-alive connection.
#[derive(Debug)]
pub struct Transaction {
    /// Set once the connection cannot carry another transaction.
    pub must_close: bool,
    /// Response status, 0 until known.
    pub status_code: u16,
    request: Option<Request>,
    response: Option<ResponseHead>,
    sent_method: Option<Method>,
    tx_headers: HeaderStore,
    head_sent: bool,
    tx_chunked: bool,
    next_chunk_size: u64,
    encoder: ChunkedEncoder,
    rx_body: RxBody,
    decoder: ChunkedDecoder,
}

impl Transaction {
    fn new(max_headers: usize, auto_chunk_size: usize) -> Self {
        Self {
            must_close: false,
            status_code: 0,
            request: None,
            response: None,
            sent_method: None,
            tx_headers: HeaderStore::with_capacity(max_headers),
            head_sent: false,
            tx_chunked: false,
            next_chunk_size: 0,
            encoder: ChunkedEncoder::new(auto_chunk_size),
            rx_body: RxBody::Done,
            decoder: ChunkedDecoder::new(),
        }
    }

    /// Clears everything but `must_close`, which stays sticky.
    fn reset(&mut self) {
        self.status_code = 0;
        self.request = None;
        self.response = None;
        self.sent_method = None;
        self.tx_headers.clear();
        self.head_sent = false;
        self.tx_chunked = false;
        self.next_chunk_size = 0;
        self.encoder.reset();
        self.rx_body = RxBody::Done;
        self.decoder.reset();
    }

    /// Version and `Connection` header of the peer's message.
    fn peer_message(&self) -> (&str, Option<&str>) {
        if let Some(resp) = &self.response {
            (&resp.version, resp.header("Connection"))
        } else if let Some(req) = &self.request {
            (&req.version, req.header("Connection"))
        } else {
            ("", None)
        }
    }
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(Response),
    Closed,
}

/// One HTTP/1.x connection over any byte transport.
///
/// Works for both ends: a server reads requests and writes responses, a
/// client writes request heads and reads responses. Body bytes are framed
/// with Content-Length, chunked coding or connection close.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    out: BytesMut,
    config: Config,
    max_request_size: usize,
    max_headers: usize,
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
    txn: Transaction,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: &Config) -> Result<Self> {
        let max_request_size = config.max_request_size()?;
        let max_headers = config.max_headers()?;
        let auto_chunk_size = config.auto_chunk_size()?;

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            out: BytesMut::with_capacity(READ_CHUNK),
            config: config.clone(),
            max_request_size,
            max_headers,
            peer: None,
            local: None,
            txn: Transaction::new(max_headers, auto_chunk_size),
            state: ConnectionState::Reading,
        })
    }

    pub fn with_addrs(mut self, peer: Option<SocketAddr>, local: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self.local = local;
        self
    }

    pub fn with_extension_hook(mut self, hook: ExtensionHook) -> Self {
        self.txn.encoder.set_extension_hook(Some(hook));
        self
    }

    pub fn transaction(&self) -> &Transaction {
        &self.txn
    }

    pub fn request(&self) -> Option<&Request> {
        self.txn.request.as_ref()
    }

    pub fn response(&self) -> Option<&ResponseHead> {
        self.txn.response.as_ref()
    }

    /// First value of a header on the peer's message.
    pub fn header(&self, name: &str) -> Option<&str> {
        match (&self.txn.response, &self.txn.request) {
            (Some(resp), _) => resp.header(name),
            (None, Some(req)) => req.header(name),
            (None, None) => None,
        }
    }

    /// Trailers received after a chunked body.
    pub fn trailers(&self) -> &HeaderStore {
        self.txn.decoder.trailers()
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Serves requests until the peer leaves or keep-alive ends.
    pub async fn run(&mut self, service: &Service) -> Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(req)) => ConnectionState::Processing(req),
                    Ok(None) => ConnectionState::Closed,
                    Err(e @ (Error::Malformed(_) | Error::CapacityExceeded { .. })) => {
                        tracing::warn!(peer = ?self.peer, error = %e, "Rejecting request");
                        self.txn.must_close = true;
                        let response = match e {
                            Error::CapacityExceeded { .. } => Response::payload_too_large(),
                            _ => Response::bad_request(),
                        };
                        ConnectionState::Writing(response)
                    }
                    Err(e) => return Err(e),
                },

                ConnectionState::Processing(req) => {
                    let path = sanitize_path_str(&req.uri);
                    let response = match service.router.find(&path) {
                        Some(m) => (m.route.handler)(&req),
                        None => Response::not_found(),
                    };
                    ConnectionState::Writing(response)
                }

                ConnectionState::Writing(response) => {
                    if let Err(e) = self.send_response(response).await {
                        if self.txn.head_sent || matches!(e, Error::Io(_)) {
                            return Err(e);
                        }
                        tracing::error!(peer = ?self.peer, error = %e, "Handler response rejected");
                        self.txn.tx_headers.clear();
                        self.txn.must_close = true;
                        self.send_response(Response::internal_error()).await?;
                    }
                    self.log_access(service).await;

                    if self.should_keep_alive() {
                        self.cleanup_after_request().await?;
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        self.stream.shutdown().await.ok();
        Ok(())
    }

    /// Reads and parses the next request head.
    ///
    /// Returns `Ok(None)` when the peer closed the connection before sending
    /// anything.
    pub async fn read_request(&mut self) -> Result<Option<Request>> {
        let Some(request) = self.read_head(parse_http_request).await? else {
            return Ok(None);
        };

        tracing::debug!(
            method = %request.method,
            uri = %request.uri,
            version = %request.version,
            headers = request.headers.len(),
            "Request head parsed"
        );

        self.txn.rx_body = if request.is_chunked() {
            RxBody::Chunked
        } else {
            match request.header("Content-Length") {
                Some(v) => RxBody::Length(parse_content_length(v)?),
                None => RxBody::Length(0),
            }
        };
        self.txn.request = Some(request.clone());
        Ok(Some(request))
    }

    /// Reads and parses a response head (client side).
    pub async fn read_response(&mut self) -> Result<ResponseHead> {
        let head = self
            .read_head(parse_http_response)
            .await?
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed before response",
                ))
            })?;

        let status = head.status.as_u16();
        let no_body = self.txn.sent_method == Some(Method::HEAD)
            || (100..200).contains(&status)
            || status == 204
            || status == 304;
        let chunked = head
            .header("Transfer-Encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));

        self.txn.rx_body = if no_body {
            RxBody::Length(0)
        } else if chunked {
            RxBody::Chunked
        } else if let Some(v) = head.header("Content-Length") {
            RxBody::Length(parse_content_length(v)?)
        } else {
            self.txn.must_close = true;
            RxBody::UntilClose
        };

        tracing::debug!(status, version = %head.version, "Response head parsed");
        self.txn.status_code = status;
        self.txn.response = Some(head.clone());
        Ok(head)
    }

    async fn read_head<T>(
        &mut self,
        parse: fn(&[u8], usize) -> std::result::Result<(T, usize), ParseError>,
    ) -> Result<Option<T>> {
        loop {
            match parse(&self.buffer, self.max_headers) {
                Ok((head, consumed)) => {
                    if consumed > self.max_request_size {
                        return Err(self.head_too_large());
                    }
                    self.buffer.advance(consumed);
                    return Ok(Some(head));
                }
                Err(ParseError::Incomplete) => {
                    if self.buffer.len() >= self.max_request_size {
                        return Err(self.head_too_large());
                    }
                }
                Err(e) => {
                    self.txn.must_close = true;
                    return Err(e.into());
                }
            }

            if self.fill_buf().await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                self.txn.must_close = true;
                return Err(Error::Malformed("connection closed inside a header block"));
            }
        }
    }

    fn head_too_large(&mut self) -> Error {
        self.txn.must_close = true;
        Error::CapacityExceeded {
            what: "header block",
            limit: self.max_request_size,
        }
    }

    async fn fill_buf(&mut self) -> Result<usize> {
        self.buffer.reserve(READ_CHUNK);
        Ok(self.stream.read_buf(&mut self.buffer).await?)
    }

    /// Whether a read would find data without waiting.
    ///
    /// Checks buffered bytes first, then polls the transport once without
    /// blocking; anything that arrives is kept for the next read. End of
    /// stream counts as available since a read returns at once.
    pub fn is_read_data_available(&mut self) -> Result<bool> {
        if !self.buffer.is_empty() {
            return Ok(true);
        }

        let mut cx = Context::from_waker(Waker::noop());
        let mut scratch = [0u8; READ_CHUNK];
        let mut read_buf = ReadBuf::new(&mut scratch);

        match Pin::new(&mut self.stream).poll_read(&mut cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                self.buffer.extend_from_slice(read_buf.filled());
                Ok(true)
            }
            Poll::Ready(Err(e)) => Err(e.into()),
            Poll::Pending => Ok(false),
        }
    }

    /// Reads body bytes of the current message. Returns 0 at end of body.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(n) = self.read_buffered(buf)? {
                return Ok(n);
            }
            if self.fill_buf().await? == 0 {
                return self.body_eof();
            }
        }
    }

    /// Serves a read from buffered bytes. `None` means more input is needed.
    fn read_buffered(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        let (n, finished) = match &mut self.txn.rx_body {
            RxBody::Done => return Ok(Some(0)),
            RxBody::Length(remaining) => {
                let n = usize::try_from(*remaining)
                    .unwrap_or(usize::MAX)
                    .min(self.buffer.len())
                    .min(buf.len());
                buf[..n].copy_from_slice(&self.buffer[..n]);
                self.buffer.advance(n);
                *remaining -= n as u64;
                (n, *remaining == 0)
            }
            RxBody::UntilClose => {
                let n = self.buffer.len().min(buf.len());
                buf[..n].copy_from_slice(&self.buffer[..n]);
                self.buffer.advance(n);
                (n, false)
            }
            RxBody::Chunked => {
                let progress = self.txn.decoder.decode(&self.buffer, buf)?;
                self.buffer.advance(progress.consumed);
                (progress.written, self.txn.decoder.is_done())
            }
        };

        if finished {
            self.txn.rx_body = RxBody::Done;
        }
        Ok((n > 0 || finished).then_some(n))
    }

    fn body_eof(&mut self) -> Result<usize> {
        self.txn.must_close = true;
        if self.txn.rx_body == RxBody::UntilClose {
            self.txn.rx_body = RxBody::Done;
            return Ok(0);
        }
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed inside a body",
        )))
    }

    pub fn set_response_code(&mut self, status: u16) {
        self.txn.status_code = status;
    }

    /// Sets an outgoing header, replacing earlier values of the same name.
    ///
    /// Once the head is out, the header is sent as a trailer after a chunked
    /// body; a non-chunked body cannot carry it and the call fails.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        if self.txn.head_sent {
            return self.add_trailer(name, value);
        }
        self.txn.tx_headers.remove_all(name);
        self.txn.tx_headers.add(name, value)
    }

    /// Adds an outgoing header without replacing earlier ones.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        if self.txn.head_sent {
            return self.add_trailer(name, value);
        }
        self.txn.tx_headers.add(name, value)
    }

    fn add_trailer(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.txn.tx_chunked {
            return Err(Error::HeadAlreadySent(name.to_string()));
        }
        self.txn.encoder.add_trailer(name, value)
    }

    /// Value for an outgoing `Connection` header given what is known so far.
    pub fn suggest_connection_header(&self) -> &'static str {
        let (version, connection) = self.txn.peer_message();
        keep_alive::suggest_connection_header(
            &self.config,
            self.txn.must_close,
            self.txn.status_code,
            version,
            connection,
        )
    }

    /// Whether another transaction may follow on this connection.
    pub fn should_keep_alive(&self) -> bool {
        let (version, connection) = self.txn.peer_message();
        keep_alive::should_keep_alive(
            &self.config,
            self.txn.must_close,
            self.txn.status_code,
            version,
            connection,
        )
    }

    /// Writes the response head. Returns the number of head bytes.
    ///
    /// `Transfer-Encoding: chunked` switches the body to chunked coding and
    /// drops any Content-Length. A `Connection` header is added when missing.
    pub async fn write_response_head(&mut self) -> Result<usize> {
        if self.txn.status_code == 0 {
            self.txn.status_code = 200;
        }
        let status = crate::http::response::StatusCode::from_u16(self.txn.status_code)
            .ok_or(Error::Malformed("status code out of range"))?;

        let chunked = self.tx_wants_chunked();
        if !chunked && !self.txn.tx_headers.contains("Content-Length") {
            // body runs until close
            self.txn.must_close = true;
        }
        if !self.txn.tx_headers.contains("Connection") {
            let suggestion = self.suggest_connection_header();
            self.txn.tx_headers.add("Connection", suggestion)?;
        }
        if self
            .txn
            .tx_headers
            .get_first_str("Connection")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("close"))
        {
            self.txn.must_close = true;
        }

        let skip: &[&str] = if chunked { &["Content-Length"] } else { &[] };
        serialize_response_head(status, &self.txn.tx_headers, skip, &mut self.out);

        let is_head = self
            .txn
            .request
            .as_ref()
            .is_some_and(|r| r.method == Method::HEAD);
        self.start_tx_body(chunked && !is_head).await
    }

    /// Writes a request head (client side). Returns the number of head bytes.
    pub async fn write_request_head(&mut self, method: Method, target: &str) -> Result<usize> {
        let chunked = self.tx_wants_chunked();
        let skip: &[&str] = if chunked { &["Content-Length"] } else { &[] };
        serialize_request_head(method, target, &self.txn.tx_headers, skip, &mut self.out);
        self.txn.sent_method = Some(method);
        self.start_tx_body(chunked).await
    }

    fn tx_wants_chunked(&self) -> bool {
        self.txn
            .tx_headers
            .values("Transfer-Encoding")
            .any(|v| v.to_ascii_lowercase().windows(7).any(|w| w == b"chunked"))
    }

    async fn start_tx_body(&mut self, chunked: bool) -> Result<usize> {
        let head_len = self.out.len();
        self.flush_out().await?;
        self.txn.head_sent = true;
        self.txn.tx_chunked = chunked;
        if chunked {
            let next = std::mem::take(&mut self.txn.next_chunk_size);
            self.txn.encoder.set_next_chunk_size(next);
        }
        tracing::trace!(bytes = head_len, chunked, "Head written");
        Ok(head_len)
    }

    /// Fixes the size of the next chunk opened on a chunked body.
    pub fn set_tx_next_chunk_size(&mut self, size: u64) {
        if self.txn.head_sent {
            self.txn.encoder.set_next_chunk_size(size);
        } else {
            self.txn.next_chunk_size = size;
        }
    }

    pub fn tx_remaining_chunk_size(&self) -> u64 {
        self.txn.encoder.remaining_chunk_size()
    }

    pub fn tx_chunk_no(&self) -> u64 {
        self.txn.encoder.chunk_no()
    }

    /// Writes body bytes, chunk-framed when the head asked for it.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.txn.tx_chunked {
            self.txn.encoder.write(data, &mut self.out)?;
        } else {
            self.out.extend_from_slice(data);
        }
        self.flush_out().await?;
        Ok(data.len())
    }

    /// Pushes buffered body data, including a partial auto-chunk, to the
    /// transport.
    pub async fn flush(&mut self) -> Result<()> {
        if self.txn.tx_chunked {
            self.txn.encoder.flush(&mut self.out);
        }
        self.flush_out().await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Ends the outgoing body: the zero chunk plus trailers when chunked.
    pub async fn finish(&mut self) -> Result<()> {
        if self.txn.tx_chunked {
            self.txn.encoder.finish(&mut self.out)?;
        }
        self.flush_out().await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn flush_out(&mut self) -> Result<()> {
        if !self.out.is_empty() {
            self.stream.write_all(&self.out).await?;
            self.out.clear();
        }
        Ok(())
    }

    /// Sends a handler's response: head, body, trailers.
    pub async fn send_response(&mut self, response: Response) -> Result<()> {
        self.set_response_code(response.status.as_u16());
        for entry in &response.headers {
            let (Some(name), Some(value)) = (entry.name_str(), entry.value_str()) else {
                continue;
            };
            self.append_header(name, value)?;
        }

        self.write_response_head().await?;

        let is_head = self
            .txn
            .request
            .as_ref()
            .is_some_and(|r| r.method == Method::HEAD);
        if !is_head {
            match &response.body {
                Body::Full(data) => {
                    self.write(data).await?;
                }
                Body::Chunked(parts) => {
                    for entry in &response.trailers {
                        if let (Some(name), Some(value)) = (entry.name_str(), entry.value_str()) {
                            self.add_header(name, value)?;
                        }
                    }
                    for part in parts {
                        if let Some(size) = part.chunk_size {
                            self.set_tx_next_chunk_size(size);
                        }
                        self.write(&part.data).await?;
                    }
                }
            }
        }

        self.finish().await?;
        tracing::info!(
            peer = ?self.peer,
            status = response.status.as_u16(),
            bytes = response.body.len(),
            "Response sent"
        );
        Ok(())
    }

    /// Readies the connection for the next transaction.
    ///
    /// An unfinished chunked body is terminated, unread body bytes are
    /// discarded and transaction state is cleared. Bytes already received
    /// for a pipelined request stay buffered.
    pub async fn cleanup_after_request(&mut self) -> Result<()> {
        if self.txn.head_sent && self.txn.tx_chunked && !self.txn.encoder.is_finished() {
            self.finish().await?;
        }

        match self.txn.rx_body {
            RxBody::Length(_) | RxBody::Chunked => {
                let mut sink = [0u8; READ_CHUNK];
                while self.read(&mut sink).await? > 0 {}
            }
            RxBody::UntilClose => self.txn.must_close = true,
            RxBody::Done => {}
        }

        self.txn.reset();
        Ok(())
    }

    async fn log_access(&mut self, service: &Service) {
        let (Some(log), Some(req)) = (&service.access_log, &self.txn.request) else {
            return;
        };
        let target = req.target();
        let ctx = LogContext {
            uri: Some(&target),
            remote: self.peer,
            local: self.local,
        };
        let line = format!(
            "{} \"{} {} HTTP/{}\" {}\n",
            self.peer.map_or_else(|| "-".to_string(), |p| p.to_string()),
            req.method,
            target,
            req.version,
            self.txn.status_code
        );
        if let Err(e) = log.record(&ctx, &Local::now(), &line).await {
            tracing::warn!(error = %e, "Failed to write access log");
        }
    }
}

fn parse_content_length(value: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Malformed("invalid Content-Length"));
    }
    value
        .parse()
        .map_err(|_| Error::Malformed("invalid Content-Length"))
}
