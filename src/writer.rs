//! Streaming response writer and its optional capabilities.
//!
//! Handlers that buffer a whole [`Response`](crate::Response) never touch this
//! module. It exists for the code in between — middleware and streaming
//! endpoints (watches, event streams, protocol upgrades) that need to commit a
//! status, push body chunks as they become available, and sometimes take the
//! raw connection away from the framework entirely.
//!
//! # Capabilities
//!
//! Three operations are optional: `flush`, `close_notice`, and `hijack`.
//! A writer declares which ones it supports through
//! [`ResponseWriter::capabilities`] — an explicit flag struct read once at
//! decoration time, so wrapping code never needs runtime downcasts. A writer
//! that does not support an operation answers `ErrorKind::Unsupported`.
//!
//! [`StreamWriter`], the writer the server hands to the handler chain,
//! supports all three.

use std::future::Future;
use std::io;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::debug;

use crate::status;

/// A heap-allocated, type-erased future for the async writer operations.
pub type WriteFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// Future returned by [`ResponseWriter::close_notice`].
///
/// Resolves when the client goes away. Best-effort: a client that pipelines a
/// second request before the response finishes also trips the notice early.
pub type CloseNotice = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// ── Capabilities ──────────────────────────────────────────────────────────────

/// The optional operations a [`ResponseWriter`] supports.
///
/// Read this once, when deciding how to wrap a writer — not per call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// [`ResponseWriter::flush`] pushes buffered output to the client now.
    pub flush: bool,
    /// [`ResponseWriter::close_notice`] can report client disconnects.
    pub close_notify: bool,
    /// [`ResponseWriter::hijack`] can surrender the raw connection.
    pub hijack: bool,
}

impl Capabilities {
    /// No optional operations.
    pub const NONE: Self = Self { flush: false, close_notify: false, hijack: false };

    /// All three optional operations.
    pub const ALL: Self = Self { flush: true, close_notify: true, hijack: true };
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The streaming side of an HTTP response.
///
/// Call order: [`header`](Self::header) calls accumulate until the status is
/// committed, [`write_status`](Self::write_status) commits the status line,
/// and [`write_body`](Self::write_body) streams chunks — committing an
/// implicit `200 OK` first if no status was set. Headers added after the head
/// has gone out are dropped silently, mirroring what the wire allows.
pub trait ResponseWriter: Send {
    /// Appends a response header. Ignored once the head has been sent.
    fn header(&mut self, name: &str, value: &str);

    /// Commits the response status.
    ///
    /// The serialized head stays buffered until the first body write, flush,
    /// or end of the response. A second call is ignored by the transport, but
    /// wrappers may still observe it.
    fn write_status(&mut self, code: u16);

    /// Writes one body chunk, sending the head first if still pending.
    fn write_body<'a>(&'a mut self, chunk: &'a [u8]) -> WriteFuture<'a>;

    /// The optional operations this writer supports.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Pushes any buffered output to the client, committing an implicit
    /// `200 OK` head if no status was set.
    fn flush(&mut self) -> WriteFuture<'_> {
        Box::pin(async { Err(unsupported("flush")) })
    }

    /// Returns a future that resolves when the client disconnects.
    fn close_notice(&mut self) -> io::Result<CloseNotice> {
        Err(unsupported("close_notice"))
    }

    /// Takes over the raw connection for non-HTTP protocols.
    ///
    /// After a successful hijack the writer is spent: body writes and flushes
    /// fail, and the server will not touch the connection again.
    fn hijack(&mut self) -> io::Result<Hijacked> {
        Err(unsupported("hijack"))
    }
}

fn unsupported(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("response writer does not support {op}"))
}

/// A connection surrendered by [`ResponseWriter::hijack`].
#[derive(Debug)]
pub struct Hijacked {
    /// The raw connection. All tokio readiness I/O (`readable`, `try_read`,
    /// `writable`, `try_write`) works through `&self`, so the shared handle
    /// is fully usable for raw protocols.
    pub stream: Arc<TcpStream>,
    /// Bytes already read off the socket but not yet consumed — typically a
    /// pipelined follow-up request. Process these before reading the stream.
    pub read_buf: Bytes,
}

// ── StreamWriter ──────────────────────────────────────────────────────────────

/// The server's concrete [`ResponseWriter`] over a TCP connection.
///
/// One is constructed per request and discarded after the handler chain
/// returns. Framing: if the handler set a `content-length` header the body is
/// streamed raw; otherwise `transfer-encoding: chunked`, terminated by
/// [`finish`](StreamWriter::finish) once the chain is done. Status codes that
/// forbid a body (204, 304) get neither.
pub struct StreamWriter {
    stream: Option<Arc<TcpStream>>,
    read_buf: Bytes,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    head_sent: bool,
    chunked: bool,
    pending: Vec<u8>,
}

impl StreamWriter {
    pub(crate) fn new(stream: Arc<TcpStream>, read_buf: Bytes) -> Self {
        Self {
            stream: Some(stream),
            read_buf,
            status: None,
            headers: Vec::new(),
            head_sent: false,
            chunked: false,
            pending: Vec::new(),
        }
    }

    /// True once [`hijack`](ResponseWriter::hijack) has taken the connection.
    pub fn is_hijacked(&self) -> bool {
        self.stream.is_none()
    }

    /// Finalizes the response after the handler chain returns: commits an
    /// implicit head if none went out, writes the terminal chunk when the
    /// body was chunked, and drains everything to the socket. No-op after a
    /// hijack.
    pub(crate) async fn finish(&mut self) -> io::Result<()> {
        if self.is_hijacked() {
            return Ok(());
        }
        self.ensure_head();
        if self.chunked {
            self.pending.extend_from_slice(b"0\r\n\r\n");
        }
        self.drain().await
    }

    /// Serializes the status line and headers into the pending buffer.
    /// Idempotent; commits `200 OK` when the handler never set a status.
    fn ensure_head(&mut self) {
        if self.head_sent {
            return;
        }
        let code = self.status.unwrap_or(200);
        self.status = Some(code);

        let bodyless = matches!(code, 204 | 304);
        let has_length = self
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-length"));
        if !bodyless && !has_length {
            self.headers.push(("transfer-encoding".to_owned(), "chunked".to_owned()));
            self.chunked = true;
        }

        self.pending
            .extend_from_slice(format!("HTTP/1.1 {} {}\r\n", code, status::reason(code)).as_bytes());
        for (name, value) in &self.headers {
            self.pending.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        self.pending.extend_from_slice(b"\r\n");
        self.head_sent = true;
    }

    /// Writes the pending buffer to the socket via the readiness API.
    async fn drain(&mut self) -> io::Result<()> {
        let Some(stream) = &self.stream else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection was hijacked"));
        };
        let stream = Arc::clone(stream);

        let mut offset = 0;
        while offset < self.pending.len() {
            stream.writable().await?;
            match stream.try_write(&self.pending[offset..]) {
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        self.pending.clear();
        Ok(())
    }

    async fn send_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.ensure_head();
        if !chunk.is_empty() {
            if self.chunked {
                self.pending.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                self.pending.extend_from_slice(chunk);
                self.pending.extend_from_slice(b"\r\n");
            } else {
                self.pending.extend_from_slice(chunk);
            }
        }
        self.drain().await
    }

    async fn flush_now(&mut self) -> io::Result<()> {
        self.ensure_head();
        self.drain().await
    }
}

impl ResponseWriter for StreamWriter {
    fn header(&mut self, name: &str, value: &str) {
        if self.head_sent {
            debug!(name, "header set after head was sent, dropped");
            return;
        }
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn write_status(&mut self, code: u16) {
        if self.status.is_some() || self.head_sent {
            debug!(code, "superfluous write_status, ignored");
            return;
        }
        self.status = Some(code);
    }

    fn write_body<'a>(&'a mut self, chunk: &'a [u8]) -> WriteFuture<'a> {
        Box::pin(self.send_body(chunk))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn flush(&mut self) -> WriteFuture<'_> {
        Box::pin(self.flush_now())
    }

    fn close_notice(&mut self) -> io::Result<CloseNotice> {
        let Some(stream) = &self.stream else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection was hijacked"));
        };
        let stream = Arc::clone(stream);
        Ok(Box::pin(async move {
            // Readable-with-nothing-to-peek means EOF or reset. Peeking keeps
            // pipelined bytes on the socket for whoever reads next.
            let mut probe = [0u8; 1];
            let _ = stream.peek(&mut probe).await;
        }))
    }

    fn hijack(&mut self) -> io::Result<Hijacked> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection already hijacked"))?;
        Ok(Hijacked { stream, read_buf: mem::take(&mut self.read_buf) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, server) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), server.unwrap().0)
    }

    async fn read_until_closed(mut stream: TcpStream) -> String {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn buffers_head_until_finish() {
        let (client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        w.header("content-length", "0");
        w.write_status(404);
        w.finish().await.unwrap();
        drop(w);

        let wire = read_until_closed(client).await;
        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(wire.contains("content-length: 0\r\n"));
    }

    #[tokio::test]
    async fn body_write_commits_implicit_200() {
        let (client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        w.write_body(b"hello").await.unwrap();
        w.finish().await.unwrap();
        drop(w);

        let wire = read_until_closed(client).await;
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("transfer-encoding: chunked\r\n"));
        assert!(wire.contains("5\r\nhello\r\n"));
        assert!(wire.ends_with("0\r\n\r\n"));
    }

    #[tokio::test]
    async fn content_length_body_is_streamed_raw() {
        let (client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        w.header("content-length", "5");
        w.write_status(200);
        w.write_body(b"hello").await.unwrap();
        w.finish().await.unwrap();
        drop(w);

        let wire = read_until_closed(client).await;
        assert!(!wire.contains("transfer-encoding"));
        assert!(wire.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn second_status_is_ignored_by_transport() {
        let (client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        w.header("content-length", "0");
        w.write_status(200);
        w.write_status(500);
        w.finish().await.unwrap();
        drop(w);

        let wire = read_until_closed(client).await;
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn flush_pushes_head_before_finish() {
        let (mut client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        w.write_status(200);
        w.flush().await.unwrap();

        let mut buf = [0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        let head = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn hijack_surrenders_the_connection() {
        let (mut client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::from_static(b"leftover"));

        let hijacked = w.hijack().unwrap();
        assert_eq!(&hijacked.read_buf[..], b"leftover");
        assert!(w.is_hijacked());
        assert!(w.hijack().is_err());
        assert!(w.close_notice().is_err());

        // The writer stays out of the way from here on.
        w.finish().await.unwrap();

        hijacked.stream.writable().await.unwrap();
        hijacked.stream.try_write(b"raw").unwrap();
        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"raw");
    }

    #[tokio::test]
    async fn close_notice_resolves_on_peer_disconnect() {
        let (client, server) = socket_pair().await;
        let mut w = StreamWriter::new(Arc::new(server), Bytes::new());

        let notice = w.close_notice().unwrap();
        drop(client);
        tokio::time::timeout(std::time::Duration::from_secs(1), notice)
            .await
            .expect("close notice did not resolve");
    }
}
