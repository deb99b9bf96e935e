use tether::Error;
use tether::config::{Config, MAX_HEADERS, MAX_REQUEST_SIZE};
use tether::http::connection::Connection;
use tether::http::request::{Method, Request};
use tether::http::response::{Response, ResponseBuilder, StatusCode};
use tether::routing::Router;
use tether::server::routes::{chunk_number_extension, default_router};
use tether::server::{AccessLog, Handler, Service};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, duplex};
use tokio::task::JoinHandle;

fn spawn_server(cfg: Config, service: Service) -> (DuplexStream, JoinHandle<tether::Result<()>>) {
    let (client, server) = duplex(64 * 1024);
    let handle = tokio::spawn(async move {
        let mut conn = Connection::new(server, &cfg)?
            .with_extension_hook(Box::new(chunk_number_extension));
        conn.run(&service).await
    });
    (client, handle)
}

async fn read_body<S>(conn: &mut Connection<S>) -> Vec<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut body = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = conn.read(&mut buf).await.unwrap();
        if n == 0 {
            return body;
        }
        body.extend_from_slice(&buf[..n]);
    }
}

async fn exchange_raw(cfg: Config, request: &[u8]) -> String {
    let (mut client, server) = spawn_server(cfg, Service::new(default_router()));
    client.write_all(request).await.unwrap();

    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    server.await.unwrap().unwrap();
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn test_keep_alive_reuses_connection() {
    let (client_io, server) = spawn_server(Config::default(), Service::new(default_router()));
    let mut client = Connection::new(client_io, &Config::default()).unwrap();

    client.add_header("Host", "test").unwrap();
    client.write_request_head(Method::GET, "/hello").await.unwrap();
    let head = client.read_response().await.unwrap();
    assert_eq!(head.status.as_u16(), 200);
    assert_eq!(head.header("Connection"), Some("keep-alive"));
    let body = read_body(&mut client).await;
    assert!(String::from_utf8_lossy(&body).contains("GET /hello"));
    assert!(client.should_keep_alive());
    client.cleanup_after_request().await.unwrap();

    client.add_header("Host", "test").unwrap();
    client.add_header("Connection", "close").unwrap();
    client.write_request_head(Method::GET, "/again").await.unwrap();
    let head = client.read_response().await.unwrap();
    assert_eq!(head.header("Connection"), Some("close"));
    assert!(!read_body(&mut client).await.is_empty());
    assert!(!client.should_keep_alive());

    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pipelined_requests_are_all_answered() {
    let raw = exchange_raw(
        Config::default(),
        b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(raw.matches("HTTP/1.1 200 OK\r\n").count(), 2);
    assert!(raw.contains("GET /a"));
    assert!(raw.contains("GET /b"));
}

#[tokio::test]
async fn test_http10_closes_after_one_response() {
    let raw = exchange_raw(
        Config::default(),
        b"GET /a HTTP/1.0\r\n\r\nGET /b HTTP/1.0\r\n\r\n",
    )
    .await;

    assert_eq!(raw.matches("HTTP/1.1 200 OK\r\n").count(), 1);
    assert!(raw.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_chunked_route_wire_format() {
    let raw = exchange_raw(
        Config::default(),
        b"GET /chunky?size=8&count=3 HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    assert!(head.contains("Transfer-Encoding: chunked"));
    assert!(!head.contains("Content-Length"));
    assert!(body.starts_with("8;n=1\r\nchunk 1 \r\n8;n=2\r\n"));
    assert!(body.ends_with("0\r\nX-Chunk-Count: 3\r\nX-Body-Bytes: 24\r\n\r\n"));
}

#[tokio::test]
async fn test_chunked_response_decoded_by_client() {
    let (client_io, server) = spawn_server(Config::default(), Service::new(default_router()));
    let mut client = Connection::new(client_io, &Config::default()).unwrap();

    client.add_header("Connection", "close").unwrap();
    client
        .write_request_head(Method::GET, "/chunky?size=5&count=4")
        .await
        .unwrap();
    let head = client.read_response().await.unwrap();
    assert_eq!(head.status.as_u16(), 200);

    let body = read_body(&mut client).await;
    assert_eq!(body.len(), 20);
    assert_eq!(&body[..5], b"chunk");
    assert_eq!(client.trailers().get_first_str("X-Chunk-Count"), Some("4"));

    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_head_gets_413() {
    let cfg = Config::default().with(MAX_REQUEST_SIZE, "64");
    let mut request = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
    request.extend(std::iter::repeat_n(b'a', 200));
    request.extend_from_slice(b"\r\n\r\n");

    let raw = exchange_raw(cfg, &request).await;
    assert!(raw.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    assert!(raw.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let raw = exchange_raw(
        Config::default(),
        b"BLAH / HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n",
    )
    .await;

    assert!(raw.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(raw.contains("Connection: close\r\n"));
    assert!(raw.ends_with("400 Bad Request"));
}

#[tokio::test]
async fn test_head_request_has_no_body() {
    let raw = exchange_raw(
        Config::default(),
        b"HEAD /x HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(raw.contains("Content-Length: "));
    assert!(raw.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_chunked_request_body_and_reply() {
    let (client_io, server_io) = duplex(64 * 1024);
    let cfg = Config::default();
    let mut client = Connection::new(client_io, &cfg).unwrap();
    let mut server = Connection::new(server_io, &cfg).unwrap();

    client.add_header("Transfer-Encoding", "chunked").unwrap();
    client.add_header("Content-Length", "999").unwrap();
    client.write_request_head(Method::POST, "/upload").await.unwrap();
    client.set_tx_next_chunk_size(4);
    client.write(b"abcdefgh").await.unwrap();
    assert_eq!(client.tx_chunk_no(), 1);
    assert_eq!(client.tx_remaining_chunk_size(), 0);
    client.add_header("X-Check", "ok").unwrap();
    client.finish().await.unwrap();

    let req = server.read_request().await.unwrap().unwrap();
    assert_eq!(req.method, Method::POST);
    assert!(req.is_chunked());
    assert_eq!(read_body(&mut server).await, b"abcdefgh");
    assert_eq!(server.trailers().get_first_str("X-Check"), Some("ok"));

    server.set_response_code(201);
    server.add_header("Content-Length", "2").unwrap();
    server.write_response_head().await.unwrap();
    assert!(matches!(
        server.add_header("X-Late", "1"),
        Err(Error::HeadAlreadySent(_))
    ));
    server.write(b"ok").await.unwrap();
    server.finish().await.unwrap();

    let head = client.read_response().await.unwrap();
    assert_eq!(head.status.as_u16(), 201);
    assert_eq!(read_body(&mut client).await, b"ok");
    assert!(client.should_keep_alive());
    assert!(server.should_keep_alive());
}

#[tokio::test]
async fn test_content_length_is_suppressed_on_chunked_heads() {
    let (client_io, mut peer) = duplex(64 * 1024);
    let mut conn = Connection::new(client_io, &Config::default()).unwrap();

    conn.add_header("Content-Length", "10").unwrap();
    conn.add_header("Transfer-Encoding", "chunked").unwrap();
    conn.add_header("X-Dup", "1").unwrap();
    conn.add_header("x-dup", "2").unwrap();
    conn.set_response_code(200);
    conn.write_response_head().await.unwrap();
    conn.write(b"hi").await.unwrap();
    conn.finish().await.unwrap();
    drop(conn);

    let mut raw = String::new();
    peer.read_to_string(&mut raw).await.unwrap();
    assert!(!raw.contains("Content-Length"));
    assert_eq!(raw.matches("dup: ").count(), 1);
    assert!(raw.contains("x-dup: 2\r\n"));
    assert!(raw.ends_with("\r\n\r\n2\r\nhi\r\n0\r\n\r\n"));
}

#[tokio::test]
async fn test_finish_with_short_explicit_chunk() {
    let (client_io, _peer) = duplex(64 * 1024);
    let mut conn = Connection::new(client_io, &Config::default()).unwrap();

    conn.add_header("Transfer-Encoding", "chunked").unwrap();
    conn.write_response_head().await.unwrap();
    conn.set_tx_next_chunk_size(10);
    conn.write(b"abc").await.unwrap();
    assert_eq!(conn.tx_remaining_chunk_size(), 7);
    assert!(matches!(
        conn.finish().await,
        Err(Error::ChunkUnderrun { remaining: 7 })
    ));
}

#[tokio::test]
async fn test_read_until_close() {
    let (client_io, mut peer) = duplex(64 * 1024);
    let mut client = Connection::new(client_io, &Config::default()).unwrap();

    client.write_request_head(Method::GET, "/").await.unwrap();
    peer.write_all(b"HTTP/1.0 200 OK\r\n\r\nhello").await.unwrap();
    peer.shutdown().await.unwrap();

    let head = client.read_response().await.unwrap();
    assert_eq!(head.version, "1.0");
    assert_eq!(read_body(&mut client).await, b"hello");
    assert!(!client.should_keep_alive());
}

#[tokio::test]
async fn test_data_available_probe() {
    let (io, mut peer) = duplex(1024);
    let mut conn = Connection::new(io, &Config::default()).unwrap();

    assert!(!conn.is_read_data_available().unwrap());

    peer.write_all(b"GET /probe HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(conn.is_read_data_available().unwrap());
    assert!(conn.is_read_data_available().unwrap());

    let req = conn.read_request().await.unwrap().unwrap();
    assert_eq!(req.uri, "/probe");
}

#[tokio::test]
async fn test_peer_leaving_before_request() {
    let (io, peer) = duplex(1024);
    drop(peer);
    let mut conn = Connection::new(io, &Config::default()).unwrap();
    assert!(conn.read_request().await.unwrap().is_none());
}

#[tokio::test]
async fn test_access_log_written_per_request() {
    let dir = std::env::temp_dir().join(format!("tether-access-{}", std::process::id()));
    let template = format!("{}/%[U].log", dir.display());

    let mut service = Service::new(default_router());
    service.access_log = Some(AccessLog::new(template));

    let (mut client, server) = spawn_server(Config::default(), service);
    client
        .write_all(b"GET /hello?x=1 HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    server.await.unwrap().unwrap();

    let line = std::fs::read_to_string(dir.join(".hello.log")).unwrap();
    assert_eq!(line, "- \"GET /hello?x=1 HTTP/1.1\" 200\n");

    std::fs::remove_dir_all(&dir).ok();
}

fn crowded(_: &Request) -> Response {
    ResponseBuilder::new(StatusCode::OK)
        .header("X-A", "1")
        .header("X-B", "2")
        .header("X-C", "3")
        .header("X-D", "4")
        .header("X-E", "5")
        .body(b"never sent".to_vec())
        .build()
}

#[tokio::test]
async fn test_unsendable_response_becomes_500() {
    let cfg = Config::default().with(MAX_HEADERS, "4");
    let router = Router::new().route("**", crowded as Handler);
    let (mut client, server) = spawn_server(cfg, Service::new(router));

    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    server.await.unwrap().unwrap();

    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(raw.contains("Connection: close\r\n"));
    assert!(!raw.contains("X-A"));
    assert!(!raw.contains("never sent"));
}
