//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: auditing, metrics, request-id injection, and
//! authentication-header inspection.
//!
//! The chain boundary is [`StreamHandler`]: a handler that receives the
//! request plus the connection's [`ResponseWriter`](crate::ResponseWriter).
//! A middleware is simply a `StreamHandler` that owns the next one —
//! it takes a handler at construction and is itself a handler, so chains
//! compose by nesting:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiri::{Method, Request, RequestContext, Response, Router, Server};
//! use kiri::middleware::{with_audit, TracingSink};
//!
//! # async fn list_pods(_req: Request) -> Response { Response::text("") }
//! # async fn run() {
//! let app = Router::new().on(Method::Get, "/api/v1/pods", list_pods);
//!
//! let mapper = Arc::new(|_req: &Request| Some(RequestContext::new().with_user("system:admin")));
//! let audited = with_audit(app, mapper, Arc::new(TracingSink));
//!
//! Server::bind("0.0.0.0:3000").serve(audited).await.unwrap();
//! # }
//! ```
//!
//! [`Router`](crate::Router) implements `StreamHandler`, so it terminates any
//! chain; plain `async fn(Request) -> impl IntoResponse` handlers never see
//! the writer.

use std::future::Future;
use std::io;
use std::pin::Pin;

use crate::request::Request;
use crate::writer::ResponseWriter;

mod audit;

pub use audit::{audit_writer, with_audit, AuditSink, AuditedWriter, TracingSink};

/// A heap-allocated, type-erased future returned by [`StreamHandler::serve`].
pub type ServeFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// A handler at the connection level: one request in, bytes out through the
/// writer.
///
/// Errors returned here are transport failures; they end the connection and
/// are logged by the server, never turned into a response.
pub trait StreamHandler: Send + Sync {
    fn serve<'a>(&'a self, req: Request, w: &'a mut dyn ResponseWriter) -> ServeFuture<'a>;
}
