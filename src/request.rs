//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::method::Method;

/// An incoming HTTP request, parsed from the raw TCP stream.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote: SocketAddr,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        remote: SocketAddr,
    ) -> Self {
        Self { method, uri, headers, body, params: HashMap::new(), remote }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> Method { self.method }

    /// The full request target as received, query string included.
    pub fn uri(&self) -> &str { &self.uri }

    /// The path component of the URI — what the router matches on.
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or(&self.uri)
    }

    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The peer address of the TCP connection.
    pub fn remote_addr(&self) -> SocketAddr { self.remote }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Best-effort originating client IP.
    ///
    /// kiri runs behind a reverse proxy, so the proxy headers win: the first
    /// `x-forwarded-for` entry, then `x-real-ip`, then the peer address of
    /// the TCP connection. The headers are trusted as-is — filtering spoofed
    /// values is the proxy's job.
    pub fn client_ip(&self) -> String {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_owned();
                }
            }
        }
        if let Some(real) = self.header("x-real-ip") {
            let real = real.trim();
            if !real.is_empty() {
                return real.to_owned();
            }
        }
        self.remote.ip().to_string()
    }
}

/// Builds a request without a connection behind it. Unit tests only.
#[cfg(test)]
pub(crate) fn test_request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request {
    Request::new(
        method,
        uri.to_owned(),
        headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
        Vec::new(),
        "10.0.0.9:52110".parse().unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_request as request;

    #[test]
    fn path_strips_the_query() {
        let req = request(Method::Get, "/api/v1/pods?watch=true", &[]);
        assert_eq!(req.path(), "/api/v1/pods");
        assert_eq!(req.uri(), "/api/v1/pods?watch=true");
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let req = request(Method::Get, "/", &[("X-Forwarded-For", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(req.client_ip(), "203.0.113.7");

        let req = request(Method::Get, "/", &[("x-real-ip", "198.51.100.2")]);
        assert_eq!(req.client_ip(), "198.51.100.2");

        let req = request(Method::Get, "/", &[]);
        assert_eq!(req.client_ip(), "10.0.0.9");
    }
}
