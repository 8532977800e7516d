//! # reqscope
//!
//! Request-scoped context and request identifiers for hyper services.
//!
//! Two middlewares, and just enough HTTP host to run them:
//!
//! - [`middleware::Context`] seeds every request's [`Store`] with fixed
//!   entries and clears the store when the chain below it returns, panics
//!   or is cancelled.
//! - [`middleware::RequestId`] stamps every request with
//!   `{hostname}/{random}-{counter}` (see [`id`]), readable downstream via
//!   [`Request::request_id`] and echoed in the `X-Request-Id` header.
//!
//! Each request owns its own store. There is no process-wide map to leak
//! into, and the identifier generator is an ordinary value you construct
//! and share explicitly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqscope::{IdGenerator, Request, Router, Server};
//! use reqscope::middleware::{Context, RequestId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqscope::Error> {
//!     let ids = Arc::new(IdGenerator::new());
//!
//!     let app = Router::new()
//!         .get("/", hello)
//!         .layer(Context::new().with("greeting", String::from("hello")))
//!         .layer(RequestId::with_generator(ids));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn hello(req: Request) -> String {
//!     let greeting = req.get_cloned::<String>("greeting").unwrap_or_default();
//!     format!("{greeting} from {}", req.request_id())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod id;
pub mod middleware;
pub mod store;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use id::IdGenerator;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use store::{Key, REQUEST_ID_KEY, Store, Value};
