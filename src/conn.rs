//! Per-connection request loop: parse, dispatch, finalize, repeat.
//!
//! One task runs this per accepted connection. Each request gets a fresh
//! [`StreamWriter`]; the root [`StreamHandler`] (the router, or a middleware
//! chain ending in it) does the rest. The loop keeps the connection alive per
//! HTTP/1.1 rules and steps aside entirely once a handler hijacks it.

use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::debug;

use crate::method::Method;
use crate::middleware::StreamHandler;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::writer::StreamWriter;

/// Upper bound on the request head. nginx caps header size in front of us;
/// this is the backstop for direct connections.
const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Serves one connection until close, error, or hijack.
pub(crate) async fn serve(
    stream: TcpStream,
    remote: SocketAddr,
    root: Arc<dyn StreamHandler>,
) -> io::Result<()> {
    let stream = Arc::new(stream);
    let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);

    loop {
        let head = loop {
            match parse_head(&buf) {
                Ok(Some(head)) => break head,
                Ok(None) if buf.len() > MAX_HEAD_BYTES => {
                    return reject(&stream, Status::RequestHeaderFieldsTooLarge).await;
                }
                Ok(None) => {}
                Err(HeadError::Malformed) => return reject(&stream, Status::BadRequest).await,
                Err(HeadError::UnknownMethod) => {
                    return reject(&stream, Status::MethodNotAllowed).await;
                }
                Err(HeadError::UnsupportedBody) => {
                    return reject(&stream, Status::LengthRequired).await;
                }
            }
            if read_some(&stream, &mut buf).await? == 0 {
                // Clean EOF between requests; mid-head is a protocol error.
                return if buf.is_empty() {
                    Ok(())
                } else {
                    Err(io::ErrorKind::UnexpectedEof.into())
                };
            }
        };

        while buf.len() < head.len + head.content_length {
            if read_some(&stream, &mut buf).await? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
        let body = buf[head.len..head.len + head.content_length].to_vec();
        let leftover = Bytes::copy_from_slice(&buf[head.len + head.content_length..]);
        buf.drain(..head.len + head.content_length);

        let keep_alive = head.keep_alive;
        let req = Request::new(head.method, head.uri, head.headers, body, remote);

        let mut w = StreamWriter::new(Arc::clone(&stream), leftover);
        root.serve(req, &mut w).await?;

        if w.is_hijacked() {
            debug!(peer = %remote, "connection hijacked");
            return Ok(());
        }
        w.finish().await?;

        if !keep_alive {
            return Ok(());
        }
    }
}

/// Appends one readiness-sized read to `buf`. `Ok(0)` means EOF.
async fn read_some(stream: &TcpStream, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut chunk = [0u8; 8 * 1024];
    loop {
        stream.readable().await?;
        match stream.try_read(&mut chunk) {
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                return Ok(n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Writes a status-only response and gives up on the connection.
async fn reject(stream: &Arc<TcpStream>, status: Status) -> io::Result<()> {
    let mut w = StreamWriter::new(Arc::clone(stream), Bytes::new());
    Response::status(status).write(&mut w).await?;
    w.finish().await
}

// ── Head parsing ──────────────────────────────────────────────────────────────

enum HeadError {
    Malformed,
    UnknownMethod,
    /// `transfer-encoding` on a request; we only read length-delimited bodies.
    UnsupportedBody,
}

struct Head {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    content_length: usize,
    keep_alive: bool,
    /// Bytes consumed by the head, blank line included.
    len: usize,
}

/// Parses a complete request head out of `buf`, or `Ok(None)` if more bytes
/// are needed.
fn parse_head(buf: &[u8]) -> Result<Option<Head>, HeadError> {
    let Some(len) = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4) else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&buf[..len]).map_err(|_| HeadError::Malformed)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(HeadError::Malformed)?;
    let mut parts = request_line.split(' ');
    let method = parts.next().ok_or(HeadError::Malformed)?;
    let uri = parts.next().ok_or(HeadError::Malformed)?;
    let version = parts.next().ok_or(HeadError::Malformed)?;
    if parts.next().is_some() || uri.is_empty() || !version.starts_with("HTTP/1.") {
        return Err(HeadError::Malformed);
    }
    let method = Method::from_str(method).map_err(|_| HeadError::UnknownMethod)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(HeadError::Malformed)?;
        headers.push((name.trim().to_owned(), value.trim().to_owned()));
    }

    if headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("transfer-encoding")) {
        return Err(HeadError::UnsupportedBody);
    }
    let content_length = match headers.iter().find(|(n, _)| n.eq_ignore_ascii_case("content-length")) {
        Some((_, v)) => v.parse::<usize>().map_err(|_| HeadError::Malformed)?,
        None => 0,
    };

    let connection = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("connection"))
        .map(|(_, v)| v.as_str());
    let keep_alive = match version {
        "HTTP/1.1" => !connection.is_some_and(|v| v.eq_ignore_ascii_case("close")),
        _ => connection.is_some_and(|v| v.eq_ignore_ascii_case("keep-alive")),
    };

    Ok(Some(Head { method, uri: uri.to_owned(), headers, content_length, keep_alive, len }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::context::{ContextMapper, RequestContext};
    use crate::middleware::{with_audit, AuditSink, ServeFuture};
    use crate::router::Router;
    use crate::writer::ResponseWriter;

    #[derive(Default)]
    struct CaptureSink {
        lines: Mutex<Vec<String>>,
    }

    impl CaptureSink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl AuditSink for CaptureSink {
        fn emit(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_owned());
        }
    }

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, server) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), server.unwrap().0)
    }

    fn spawn_conn(server: TcpStream, root: Arc<dyn StreamHandler>) -> tokio::task::JoinHandle<io::Result<()>> {
        let remote = server.peer_addr().unwrap();
        tokio::spawn(serve(server, remote, root))
    }

    async fn pods(_req: Request) -> Response {
        Response::json(br#"["pod-a"]"#.to_vec())
    }

    async fn echo(req: Request) -> Response {
        Response::text(String::from_utf8_lossy(req.body()).into_owned())
    }

    fn app() -> Router {
        Router::new()
            .on(Method::Get, "/api/v1/pods", pods)
            .on(Method::Post, "/echo", echo)
    }

    #[tokio::test]
    async fn audited_request_end_to_end() {
        let (mut client, server) = socket_pair().await;
        let sink = Arc::new(CaptureSink::default());
        let mapper: Arc<dyn ContextMapper> = Arc::new(|req: &Request| {
            req.header("x-remote-user")
                .map(|u| RequestContext::new().with_user(u).with_namespace("default"))
        });
        let root: Arc<dyn StreamHandler> =
            Arc::new(with_audit(app(), mapper, Arc::clone(&sink) as Arc<dyn AuditSink>));
        let task = spawn_conn(server, root);

        client
            .write_all(
                b"GET /api/v1/pods?limit=1 HTTP/1.1\r\n\
                  host: example\r\n\
                  impersonate-user: alice\r\n\
                  x-forwarded-for: 203.0.113.9\r\n\
                  x-remote-user: system:admin\r\n\
                  connection: close\r\n\r\n",
            )
            .await
            .unwrap();

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        let wire = String::from_utf8(wire).unwrap();
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("content-type: application/json\r\n"));
        assert!(wire.ends_with(r#"["pod-a"]"#));

        task.await.unwrap().unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(
            r#"method="GET" user="system:admin" as="alice" namespace="default" uri="/api/v1/pods?limit=1""#
        ));
        assert!(lines[0].contains(r#"ip="203.0.113.9""#));
        assert!(lines[1].ends_with(r#"response="200""#));
    }

    #[tokio::test]
    async fn keep_alive_serves_pipelined_requests() {
        let (mut client, server) = socket_pair().await;
        let task = spawn_conn(server, Arc::new(app()));

        client
            .write_all(
                b"POST /echo HTTP/1.1\r\ncontent-length: 5\r\n\r\nhello\
                  POST /echo HTTP/1.1\r\ncontent-length: 5\r\n\r\nworld",
            )
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        let wire = String::from_utf8(wire).unwrap();
        assert_eq!(wire.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(wire.contains("hello"));
        assert!(wire.ends_with("world"));

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_method_is_rejected_with_405() {
        let (mut client, server) = socket_pair().await;
        let task = spawn_conn(server, Arc::new(app()));

        client.write_all(b"BOGUS / HTTP/1.1\r\n\r\n").await.unwrap();

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        assert!(String::from_utf8(wire).unwrap().starts_with("HTTP/1.1 405 "));
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_request_line_is_rejected_with_400() {
        let (mut client, server) = socket_pair().await;
        let task = spawn_conn(server, Arc::new(app()));

        client.write_all(b"garbage\r\n\r\n").await.unwrap();

        let mut wire = Vec::new();
        client.read_to_end(&mut wire).await.unwrap();
        assert!(String::from_utf8(wire).unwrap().starts_with("HTTP/1.1 400 "));
        task.await.unwrap().unwrap();
    }

    /// A handler that takes the connection over and speaks its own protocol.
    struct Upgrade;

    impl StreamHandler for Upgrade {
        fn serve<'a>(&'a self, _req: Request, w: &'a mut dyn ResponseWriter) -> ServeFuture<'a> {
            Box::pin(async move {
                let hijacked = w.hijack()?;
                hijacked.stream.writable().await?;
                hijacked.stream.try_write(b"RAW")?;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn hijacked_connection_bypasses_http_framing() {
        let (mut client, server) = socket_pair().await;
        let task = spawn_conn(server, Arc::new(Upgrade));

        client.write_all(b"GET /upgrade HTTP/1.1\r\n\r\n").await.unwrap();

        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RAW");

        // The loop stepped aside: no finish(), no trailing HTTP bytes.
        task.await.unwrap().unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
