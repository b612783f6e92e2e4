//! # kiri
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, with
//! request auditing built in. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients, and body-size limits.
//! kiri does not — by design. The proxy does proxy things. The framework
//! does framework things. Every feature kiri skips is one nginx already
//! ships, tested at scale, at no cost to you.
//!
//! What nginx / ingress already owns — kiri intentionally ignores:
//!
//! - **Body-size limits** — `client_max_body_size` in nginx
//! - **Rate limiting** — `limit_req` / ingress-nginx annotations
//! - **Slow-client protection** — nginx timeout and buffer settings
//! - **TLS termination** — nginx SSL / k8s ingress
//!
//! What's left for kiri — the only part that changes between applications:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - Async I/O — tokio, raw HTTP/1.1
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//! - Request auditing — who did what, as whom, answered with which status
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use kiri::{Method, Request, Response, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::Get,  "/users/{id}", get_user)
//!         .on(Method::Post, "/users",      create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     // kiri sends bytes — it doesn't care how you build them:
//!     //   serde_json::to_vec(&user).unwrap()
//!     //   format!(r#"{{"id":"{id}"}}"#).into_bytes()
//!     # let bytes: Vec<u8> = vec![];
//!     Response::json(bytes)
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(Status::BadRequest);
//!     }
//!     # let bytes: Vec<u8> = vec![];
//!     Response::builder()
//!         .status(Status::Created)
//!         .header("location", "/users/99")
//!         .json(bytes)
//! }
//! ```
//!
//! ## Auditing
//!
//! Wrap the router with [`middleware::with_audit`] and every request logs two
//! correlated lines — one when it arrives, one when its status is committed:
//!
//! ```text
//! AUDIT: id="4f0e..." ip="10.2.0.1" method="GET" user="system:admin" as="<self>" namespace="<none>" uri="/users/42"
//! AUDIT: id="4f0e..." response="200"
//! ```
//!
//! See [`middleware`] for how the chain composes and [`ResponseWriter`] for
//! the streaming layer it taps into.

mod conn;
mod context;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;
mod writer;

pub mod health;
pub mod middleware;

pub use context::{ContextMapper, RequestContext};
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::Router;
pub use server::Server;
pub use status::Status;
pub use writer::{Capabilities, CloseNotice, Hijacked, ResponseWriter, StreamWriter, WriteFuture};
