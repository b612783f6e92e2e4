//! Request-scoped context: who is calling, and in which namespace.
//!
//! kiri does not resolve authentication itself — that belongs to the layer in
//! front (an auth proxy, a token filter, the application). Whatever does the
//! resolving exposes its answer through a [`ContextMapper`], and middleware
//! consumes it. Absence at every level is tolerated: no mapper hit, no user,
//! no namespace are all normal.

use crate::request::Request;

/// What is known about the caller of one request.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    user: Option<String>,
    namespace: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the authenticated principal's display name.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the namespace the request operates in.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Maps a request to its resolved context, if one exists.
///
/// Implemented for any `Fn(&Request) -> Option<RequestContext>`, so a closure
/// is usually all you need:
///
/// ```rust
/// use kiri::{Request, RequestContext};
///
/// let mapper = |req: &Request| {
///     req.header("x-remote-user")
///         .map(|u| RequestContext::new().with_user(u))
/// };
/// # let _ = &mapper as &dyn kiri::ContextMapper;
/// ```
pub trait ContextMapper: Send + Sync {
    /// Returns the context for `req`, or `None` when nothing is known.
    fn get(&self, req: &Request) -> Option<RequestContext>;
}

impl<F> ContextMapper for F
where
    F: Fn(&Request) -> Option<RequestContext> + Send + Sync,
{
    fn get(&self, req: &Request) -> Option<RequestContext> {
        self(req)
    }
}
