//! Minimal kiri example — audited CRUD-style JSON endpoints and health checks.
//!
//! Run with:
//!   RUST_LOG=info,audit=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'impersonate-user: alice' -H 'x-remote-user: admin' http://localhost:3000/users/42
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/healthz
//!
//! Every request logs two AUDIT lines sharing one correlation id — grep the
//! id to match a response code back to the request that caused it.

use std::sync::Arc;

use kiri::middleware::{with_audit, TracingSink};
use kiri::{health, Method, Request, RequestContext, Response, Router, Server, Status};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .on(Method::Get,    "/users/{id}", get_user)
        .on(Method::Post,   "/users",      create_user)
        .on(Method::Delete, "/users/{id}", delete_user)
        .on(Method::Get,    "/healthz",    health::liveness)
        .on(Method::Get,    "/readyz",     health::readiness);

    // Whatever authenticates requests in front of kiri tells the audit layer
    // who is calling. Here: a trusted header set by the proxy.
    let mapper = Arc::new(|req: &Request| {
        req.header("x-remote-user")
            .map(|user| RequestContext::new().with_user(user))
    });

    let audited = with_audit(app, mapper, Arc::new(TracingSink));

    Server::bind("0.0.0.0:3000")
        .serve(audited)
        .await
        .expect("server error");
}

// GET /users/{id}
//
// Response::json takes Vec<u8> — pass bytes from your serialiser:
//   serde_json:  Response::json(serde_json::to_vec(&user).unwrap())
//   hand-built:  Response::json(format!(...).into_bytes())  ← zero-cost, no copy
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
//
// req.body() is &[u8] — parse with serde_json::from_slice, simd-json, etc.
// kiri does not touch the bytes.
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(Status::BadRequest);
    }

    // Real app: let input: CreateUser = serde_json::from_slice(req.body()).unwrap();
    Response::builder()
        .status(Status::Created)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> Response {
    Response::status(Status::NoContent)
}
