//! Incoming HTTP request type.

use std::any::Any;
use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::store::{Key, Store, Value};

/// An incoming HTTP request with its body fully read.
///
/// Each request owns a fresh [`Store`]; the `set`/`get` family below are
/// shortcuts for the same calls on [`Request::store`].
pub struct Request {
    parts: Parts,
    body: Bytes,
    pub(crate) params: HashMap<String, String>,
    store: Store,
}

impl Request {
    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// This request's key/value store.
    pub fn store(&self) -> &Store { &self.store }

    pub fn set<V: Any + Send + Sync>(&self, key: impl Into<Key>, value: V) {
        self.store.set(key, value);
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        self.store.get(key)
    }

    pub fn get_cloned<T: Any + Clone>(&self, key: impl Into<Key>) -> Option<T> {
        self.store.get_cloned(key)
    }

    /// Empties this request's store.
    pub fn clear_scope(&self) {
        self.store.clear();
    }

    /// The identifier assigned by [`RequestId`](crate::middleware::RequestId),
    /// or `""` if none was assigned.
    pub fn request_id(&self) -> String {
        self.store.request_id()
    }

    pub fn set_request_id(&self, id: impl Into<String>) {
        self.store.set_request_id(id);
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body, params: HashMap::new(), store: Store::new() }
    }
}
