//! Middleware layer.
//!
//! A middleware turns the next handler into a new handler: it receives the
//! request together with [`Next`], may touch the request, decides when (and
//! whether) to run the rest of the chain, and may touch the response on the
//! way out.
//!
//! ```text
//! router.layer(Context::new().with("tenant", "acme"))
//!       .layer(RequestId::new());
//!
//! RequestId → Context → handler
//!                          ↓
//! RequestId ← Context ←────┘
//! ```
//!
//! The last layer added runs first. Put [`RequestId`] outermost so every
//! layer below it can log the identifier.
//!
//! Built-in middleware:
//! - [`Context`] — seeds the request store with fixed entries, clears it on exit
//! - [`RequestId`] — stamps each request with a unique `X-Request-Id`

pub mod context;
pub mod request_id;

use std::sync::Arc;

pub use context::{Arg, Context};
pub use request_id::RequestId;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

/// A request/response interceptor.
///
/// Implementors return a boxed future so the chain stays object-safe; build
/// it with `Box::pin(async move { … })`.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of the chain below a middleware.
pub struct Next(BoxedHandler);

impl Next {
    /// Runs the rest of the chain. Consumes `self`: the chain runs at most once.
    pub fn run(self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

/// Wraps `next` so that `mw` runs in front of it.
pub(crate) fn wrap(mw: Arc<dyn Middleware>, next: BoxedHandler) -> BoxedHandler {
    Arc::new(Layered { mw, next })
}

struct Layered {
    mw: Arc<dyn Middleware>,
    next: BoxedHandler,
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        self.mw.call(req, Next(Arc::clone(&self.next)))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;
    use crate::handler::Handler;
    use crate::response::Response;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Record {
        fn call(&self, req: Request, next: Next) -> BoxFuture {
            let name = self.name;
            let log = Arc::clone(&self.log);
            Box::pin(async move {
                log.lock().push(format!("{name} in"));
                let res = next.run(req).await;
                log.lock().push(format!("{name} out"));
                res
            })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn call(&self, _req: Request, _next: Next) -> BoxFuture {
            Box::pin(async { Response::text("blocked") })
        }
    }

    fn request() -> Request {
        http::Request::new(Bytes::new()).into()
    }

    #[tokio::test]
    async fn test_outer_layer_wraps_inner() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = (|_req: Request| async { "ok" }).into_boxed_handler();
        let inner = wrap(Arc::new(Record { name: "inner", log: Arc::clone(&log) }), handler);
        let outer = wrap(Arc::new(Record { name: "outer", log: Arc::clone(&log) }), inner);

        let res = outer.call(request()).await;

        assert_eq!(res.body(), b"ok");
        assert_eq!(*log.lock(), ["outer in", "inner in", "inner out", "outer out"]);
    }

    #[tokio::test]
    async fn test_middleware_may_skip_next() {
        let handler = (|_req: Request| async { "unreachable" }).into_boxed_handler();
        let chain = wrap(Arc::new(ShortCircuit), handler);

        assert_eq!(chain.call(request()).await.body(), b"blocked");
    }
}
