//! Opaque description of one remote side-effecting call
//!
//! A migration version is an ordered list of [`Operation`]s. The engine does
//! not interpret them beyond the `wait_for_active_shards` clamp; the catalogue
//! of typed changes that produces them lives outside the core.

use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Method {
    /// The canonical upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote call: method, path, optional body, headers, query parameters
///
/// Headers are a multimap (the same name may repeat); query parameters are
/// single-valued and kept sorted for deterministic dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub params: BTreeMap<String, String>,
}

impl Operation {
    /// Create an operation with no body, headers, or parameters
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Attach a request body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a header (repeats allowed)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a query parameter, replacing any previous value
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Look up a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_fields() {
        let op = Operation::new(Method::Put, "/events")
            .with_body("{}")
            .with_header("Content-Type", "application/json")
            .with_param("wait_for_active_shards", "2")
            .with_param("refresh", "true");

        assert_eq!(op.method, Method::Put);
        assert_eq!(op.path, "/events");
        assert_eq!(op.body.as_deref(), Some("{}"));
        assert_eq!(op.headers.len(), 1);
        assert_eq!(op.param("refresh"), Some("true"));
        assert_eq!(op.param("missing"), None);
    }

    #[test]
    fn with_param_replaces_existing_value() {
        let op = Operation::new(Method::Post, "/x")
            .with_param("refresh", "false")
            .with_param("refresh", "true");
        assert_eq!(op.param("refresh"), Some("true"));
        assert_eq!(op.params.len(), 1);
    }

    #[test]
    fn headers_may_repeat() {
        let op = Operation::new(Method::Get, "/x")
            .with_header("Accept", "application/json")
            .with_header("Accept", "text/plain");
        assert_eq!(op.headers.len(), 2);
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
