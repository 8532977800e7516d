//! Request-ID middleware.
//!
//! Stamps every request with the next identifier from an [`IdGenerator`]:
//! stored under [`REQUEST_ID_KEY`](crate::store::REQUEST_ID_KEY) (read it
//! with [`Request::request_id`]), mirrored into the request's
//! `X-Request-Id` header, and echoed back on the response. The rest of the
//! chain runs inside a `request` span carrying the identifier, so every log
//! line below this layer is correlated.

use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use tracing::{Instrument, debug, info_span, warn};

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::id::IdGenerator;
use crate::request::Request;

/// Default header carrying the identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Middleware assigning each request a unique identifier.
#[derive(Clone, Debug)]
pub struct RequestId {
    generator: Arc<IdGenerator>,
    header: HeaderName,
}

impl RequestId {
    /// Uses a fresh generator of its own.
    pub fn new() -> Self {
        Self::with_generator(Arc::new(IdGenerator::new()))
    }

    /// Draws identifiers from a shared generator.
    pub fn with_generator(generator: Arc<IdGenerator>) -> Self {
        Self { generator, header: X_REQUEST_ID }
    }

    /// Replaces the header name (default `x-request-id`).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHeader`] if `name` is not a valid header name.
    pub fn header(mut self, name: &str) -> Result<Self, Error> {
        self.header = HeaderName::try_from(name)
            .map_err(|_| Error::InvalidHeader(name.to_owned()))?;
        Ok(self)
    }

    pub fn generator(&self) -> &Arc<IdGenerator> {
        &self.generator
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestId {
    fn call(&self, mut req: Request, next: Next) -> BoxFuture {
        let id = self.generator.next_id();
        let header = self.header.clone();

        Box::pin(async move {
            req.set_request_id(id.clone());

            // Host names are not guaranteed to be header-safe.
            let value = match HeaderValue::try_from(id.as_str()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(request_id = %id, "request id is not a valid header value");
                    None
                }
            };
            if let Some(value) = &value {
                req.headers_mut().insert(header.clone(), value.clone());
            }

            let span = info_span!("request", request_id = %id);
            debug!(parent: &span, method = %req.method(), path = req.path(), "request id assigned");

            let mut res = next.run(req).instrument(span).await;
            if let Some(value) = value {
                res.headers_mut().insert(header, value);
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::{Context, wrap};
    use crate::response::Response;

    fn request() -> Request {
        http::Request::new(Bytes::new()).into()
    }

    fn echo_id() -> crate::handler::BoxedHandler {
        (|req: Request| async move {
            let from_header = req.header("x-request-id").unwrap_or_default().to_owned();
            Response::text(format!("{}|{from_header}", req.request_id()))
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn test_sequential_ids() {
        let generator = Arc::new(IdGenerator::with_hostname("test-host"));
        let prefix = generator.prefix().to_owned();
        let chain = wrap(Arc::new(RequestId::with_generator(generator)), echo_id());

        let first = chain.call(request()).await;
        let second = chain.call(request()).await;

        assert_eq!(first.header("x-request-id"), Some(format!("{prefix}-000001").as_str()));
        assert_eq!(second.header("x-request-id"), Some(format!("{prefix}-000002").as_str()));
    }

    #[tokio::test]
    async fn test_handler_sees_id_in_store_and_header() {
        let generator = Arc::new(IdGenerator::with_hostname("test-host"));
        let expected = format!("{}-000001", generator.prefix());
        let chain = wrap(Arc::new(RequestId::with_generator(generator)), echo_id());

        let res = chain.call(request()).await;

        assert_eq!(res.body(), format!("{expected}|{expected}").as_bytes());
    }

    #[tokio::test]
    async fn test_custom_header() {
        let mw = RequestId::new().header("x-correlation-id").unwrap();
        let chain = wrap(Arc::new(mw), echo_id());

        let res = chain.call(request()).await;

        assert!(res.header("x-correlation-id").is_some());
        assert!(res.header("x-request-id").is_none());
    }

    #[test]
    fn test_invalid_header_name() {
        let err = RequestId::new().header("not a header").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(name) if name == "not a header"));
    }

    #[tokio::test]
    async fn test_shared_generator_across_middlewares() {
        let generator = Arc::new(IdGenerator::with_hostname("test-host"));
        let a = wrap(Arc::new(RequestId::with_generator(Arc::clone(&generator))), echo_id());
        let b = wrap(Arc::new(RequestId::with_generator(Arc::clone(&generator))), echo_id());

        let ra = a.call(request()).await;
        let rb = b.call(request()).await;

        assert_ne!(ra.header("x-request-id"), rb.header("x-request-id"));
        assert!(generator.next_id().ends_with("-000003"));
    }

    #[tokio::test]
    async fn test_id_cleared_when_context_layer_exits() {
        let generator = Arc::new(IdGenerator::with_hostname("test-host"));
        let inner = wrap(Arc::new(Context::new()), echo_id());
        let chain = wrap(Arc::new(RequestId::with_generator(generator)), inner);

        let req = request();
        let store = req.store().clone();
        let res = chain.call(req).await;

        assert!(res.header("x-request-id").is_some());
        assert_eq!(store.request_id(), "");
    }
}
