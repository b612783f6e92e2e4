//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler. That is all.
//!
//! The router is also the innermost [`StreamHandler`]: it terminates a
//! middleware chain by resolving the handler, running it, and writing the
//! buffered [`Response`] through the connection's writer. Handlers stay
//! oblivious to the streaming layer.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{ServeFuture, StreamHandler};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::writer::ResponseWriter;

/// The application router.
///
/// One radix tree per HTTP method — O(path-length) lookup, no allocations on
/// the hot path. Build it once at startup; pass it (or a middleware chain
/// ending in it) to [`Server::serve`](crate::Server::serve). Each
/// [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use kiri::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// # async fn delete_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Delete, "/users/{id}", delete_user)
    ///     .on(Method::Get,    "/users/{id}", get_user)
    ///     .on(Method::Post,   "/users",      create_user);
    /// ```
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler)
    }

    fn add(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl StreamHandler for Router {
    fn serve<'a>(&'a self, req: Request, w: &'a mut dyn ResponseWriter) -> ServeFuture<'a> {
        Box::pin(async move {
            let response = match self.lookup(req.method(), req.path()) {
                Some((handler, params)) => handler.call(req.with_params(params)).await,
                None => Response::status(Status::NotFound),
            };
            response.write(w).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::request::test_request;
    use crate::writer::WriteFuture;

    #[derive(Default)]
    struct RecordingWriter {
        statuses: Vec<u16>,
        body: Vec<u8>,
    }

    impl ResponseWriter for RecordingWriter {
        fn header(&mut self, _name: &str, _value: &str) {}

        fn write_status(&mut self, code: u16) {
            self.statuses.push(code);
        }

        fn write_body<'a>(&'a mut self, chunk: &'a [u8]) -> WriteFuture<'a> {
            self.body.extend_from_slice(chunk);
            Box::pin(async { Ok(()) })
        }
    }

    async fn echo_id(req: Request) -> Response {
        Response::text(req.param("id").unwrap_or("none").to_owned())
    }

    #[tokio::test]
    async fn routes_and_writes_the_response() {
        let router = Router::new().on(Method::Get, "/users/{id}", echo_id);

        let mut w = RecordingWriter::default();
        router.serve(test_request(Method::Get, "/users/42", &[]), &mut w).await.unwrap();

        assert_eq!(w.statuses, vec![200]);
        assert_eq!(w.body, b"42");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = Router::new().on(Method::Get, "/users/{id}", echo_id);

        let mut w = RecordingWriter::default();
        router.serve(test_request(Method::Get, "/nope", &[]), &mut w).await.unwrap();

        assert_eq!(w.statuses, vec![404]);
        assert!(w.body.is_empty());
    }

    #[tokio::test]
    async fn method_mismatch_is_404() {
        let router = Router::new().on(Method::Get, "/users/{id}", echo_id);

        let mut w = RecordingWriter::default();
        router.serve(test_request(Method::Post, "/users/42", &[]), &mut w).await.unwrap();

        assert_eq!(w.statuses, vec![404]);
    }
}
