//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Trees map paths to slots
//! in a handler table, so [`Router::layer`] can wrap every registered
//! handler in place.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<usize>>,
    handlers: Vec<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), handlers: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with an earlier route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let slot = self.handlers.len();
        self.routes
            .entry(method)
            .or_default()
            .insert(path, slot)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.handlers.push(handler.into_boxed_handler());
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Wraps every route registered so far in `mw`.
    ///
    /// Routes added afterwards are not wrapped. The last layer added is the
    /// outermost and sees the request first.
    pub fn layer(mut self, mw: impl Middleware) -> Self {
        let mw: Arc<dyn Middleware> = Arc::new(mw);
        for handler in &mut self.handlers {
            *handler = middleware::wrap(Arc::clone(&mw), Arc::clone(handler));
        }
        self
    }

    /// Routes one request and runs it through its handler chain.
    ///
    /// Unknown routes answer `404`. A panic anywhere in the chain is caught,
    /// logged and answered with `500`; middleware drop guards still run
    /// during unwinding.
    pub async fn handle(&self, mut req: Request) -> Response {
        let Some((handler, params)) = self.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };
        req.params = params;

        let method = req.method().clone();
        let path = req.path().to_owned();
        match AssertUnwindSafe(async move { handler.call(req).await })
            .catch_unwind()
            .await
        {
            Ok(res) => res,
            Err(_) => {
                error!(%method, %path, "handler panicked");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(self.handlers.get(*matched.value)?);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
