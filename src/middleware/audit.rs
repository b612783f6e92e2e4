//! Request/response audit logging.
//!
//! Every request produces two log lines tied together by a correlation id:
//!
//! ```text
//! AUDIT: id="b8e7..." ip="203.0.113.7" method="GET" user="system:admin" as="alice" namespace="default" uri="/api/v1/pods"
//! AUDIT: id="b8e7..." response="200"
//! ```
//!
//! The request line is emitted before the inner handler runs; the response
//! line fires when the handler commits a status through the wrapped writer.
//! Both formats are stable — log-scraping consumers parse them.
//!
//! Auditing is best-effort by construction: missing context, missing user,
//! and a missing impersonation header all normalize to sentinels, and sink
//! failures stay inside the sink. Nothing here can fail a request or change
//! the response the client sees.

use std::io;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::context::ContextMapper;
use crate::request::Request;
use crate::writer::{Capabilities, CloseNotice, Hijacked, ResponseWriter, WriteFuture};

use super::{ServeFuture, StreamHandler};

// ── Audit sink ────────────────────────────────────────────────────────────────

/// Line-oriented destination for audit output.
///
/// Injected rather than called globally so tests (and deployments with their
/// own log plumbing) can substitute a sink. Implementations swallow their own
/// failures; `emit` has no way to report one and callers would ignore it
/// anyway.
pub trait AuditSink: Send + Sync {
    /// Emits one audit line.
    fn emit(&self, line: &str);
}

/// The default sink: one `info` event per line on the `audit` target.
///
/// Filter with `RUST_LOG=audit=info` (or drop the target entirely to silence
/// auditing without touching the handler chain).
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "audit", "{line}");
    }
}

// ── Correlation-tagged writer ─────────────────────────────────────────────────

/// Decorates a [`ResponseWriter`] so that committing a status emits an audit
/// line carrying the correlation id.
///
/// Everything else passes through untouched. The interception is not
/// idempotent: every `write_status` call received is logged and forwarded,
/// even a superfluous second one — the transport decides what to do with it.
/// Conversely, a status the transport commits on its own (the implicit
/// `200 OK` when a body write precedes any explicit status) never passes
/// through here and produces no response line.
///
/// This type exposes none of the optional writer capabilities; see
/// [`audit_writer`] for the variant selection that preserves them.
pub struct AuditWriter<'a> {
    inner: &'a mut (dyn ResponseWriter + 'a),
    sink: Arc<dyn AuditSink>,
    id: String,
}

impl<'a> AuditWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter, sink: Arc<dyn AuditSink>, id: String) -> Self {
        Self { inner, sink, id }
    }

    /// The correlation id this writer logs under.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl ResponseWriter for AuditWriter<'_> {
    fn header(&mut self, name: &str, value: &str) {
        self.inner.header(name, value);
    }

    fn write_status(&mut self, code: u16) {
        self.sink.emit(&format!("AUDIT: id={:?} response=\"{}\"", self.id, code));
        self.inner.write_status(code);
    }

    fn write_body<'b>(&'b mut self, chunk: &'b [u8]) -> WriteFuture<'b> {
        self.inner.write_body(chunk)
    }

    // Optional capabilities deliberately stay at the trait defaults: this
    // wrapper advertises none and answers Unsupported.
}

// ── Capability-preserving selection ───────────────────────────────────────────

/// An audit-wrapped writer, tagged by how much of the underlying writer's
/// optional capability set it carries forward.
pub enum AuditedWriter<'a> {
    /// Status interception only. No optional capabilities, regardless of
    /// what the underlying writer supports.
    Basic(AuditWriter<'a>),
    /// Status interception plus flush, close-notify, and hijack, each
    /// forwarded to the underlying writer.
    Streaming(AuditWriter<'a>),
}

impl<'a> AuditedWriter<'a> {
    fn tagged(&mut self) -> &mut AuditWriter<'a> {
        match self {
            Self::Basic(w) | Self::Streaming(w) => w,
        }
    }

    /// True when the streaming capabilities are forwarded.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }
}

impl ResponseWriter for AuditedWriter<'_> {
    fn header(&mut self, name: &str, value: &str) {
        self.tagged().header(name, value);
    }

    fn write_status(&mut self, code: u16) {
        self.tagged().write_status(code);
    }

    fn write_body<'b>(&'b mut self, chunk: &'b [u8]) -> WriteFuture<'b> {
        self.tagged().write_body(chunk)
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            Self::Basic(_) => Capabilities::NONE,
            Self::Streaming(w) => w.inner.capabilities(),
        }
    }

    fn flush(&mut self) -> WriteFuture<'_> {
        match self {
            Self::Basic(w) => w.flush(), // trait default: Unsupported
            Self::Streaming(w) => w.inner.flush(),
        }
    }

    fn close_notice(&mut self) -> io::Result<CloseNotice> {
        match self {
            Self::Basic(w) => w.close_notice(),
            Self::Streaming(w) => w.inner.close_notice(),
        }
    }

    fn hijack(&mut self) -> io::Result<Hijacked> {
        match self {
            Self::Basic(w) => w.hijack(),
            Self::Streaming(w) => w.inner.hijack(),
        }
    }
}

/// Wraps `inner` for audit logging, preserving its capability set when — and
/// only when — it is complete.
///
/// The underlying writer's [`Capabilities`] are read once, here. All three
/// present selects [`AuditedWriter::Streaming`]; anything less falls back to
/// [`AuditedWriter::Basic`], which forwards none of them. The all-or-nothing
/// rule means a writer with a partial capability set loses the capabilities
/// it did have; callers needing partial forwarding are out of scope.
pub fn audit_writer<'a>(
    inner: &'a mut dyn ResponseWriter,
    sink: Arc<dyn AuditSink>,
    id: String,
) -> AuditedWriter<'a> {
    let caps = inner.capabilities();
    let tagged = AuditWriter::new(inner, sink, id);
    if caps.flush && caps.close_notify && caps.hijack {
        AuditedWriter::Streaming(tagged)
    } else {
        AuditedWriter::Basic(tagged)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Wraps `next` with audit logging of every request and response.
///
/// Per request: resolve the caller's context through `mapper` (absence is
/// fine), read the `Impersonate-User` header (`<self>` when missing), take
/// the namespace from the context (`<none>` when missing), mint a fresh
/// correlation id, emit the request line, then run `next` with the writer
/// wrapped by [`audit_writer`] so the status commit emits the response line
/// under the same id.
pub fn with_audit(
    next: impl StreamHandler + 'static,
    mapper: Arc<dyn ContextMapper>,
    sink: Arc<dyn AuditSink>,
) -> impl StreamHandler {
    Audit { next, mapper, sink }
}

struct Audit<H> {
    next: H,
    mapper: Arc<dyn ContextMapper>,
    sink: Arc<dyn AuditSink>,
}

impl<H: StreamHandler> StreamHandler for Audit<H> {
    fn serve<'a>(&'a self, req: Request, w: &'a mut dyn ResponseWriter) -> ServeFuture<'a> {
        Box::pin(async move {
            let ctx = self.mapper.get(&req).unwrap_or_default();
            let user = ctx.user().unwrap_or_default().to_owned();
            let as_user = match req.header("Impersonate-User") {
                Some(v) if !v.is_empty() => v.to_owned(),
                _ => "<self>".to_owned(),
            };
            let namespace = match ctx.namespace() {
                Some(ns) if !ns.is_empty() => ns.to_owned(),
                _ => "<none>".to_owned(),
            };
            let id = Uuid::new_v4().to_string();

            self.sink.emit(&format!(
                "AUDIT: id={:?} ip={:?} method={:?} user={:?} as={:?} namespace={:?} uri={:?}",
                id,
                req.client_ip(),
                req.method().as_str(),
                user,
                as_user,
                namespace,
                req.uri(),
            ));

            let mut audited = audit_writer(w, Arc::clone(&self.sink), id);
            self.next.serve(req, &mut audited).await
        })
    }
}
