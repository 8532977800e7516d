//! Minimal reqscope example: request ids plus a request-scoped context.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/users/42

use std::sync::Arc;

use reqscope::middleware::{Context, RequestId};
use reqscope::{IdGenerator, Request, Response, Router, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), reqscope::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // One generator per process, shared by every router that stamps ids.
    let ids = Arc::new(IdGenerator::new());
    info!(prefix = ids.prefix(), "request id prefix");

    let context = Context::from_args(reqscope::args!["service", "users", "region", "eu-west"])?;

    let app = Router::new()
        .get("/", whoami)
        .get("/users/{id}", get_user)
        .layer(context)
        .layer(RequestId::with_generator(ids));

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET / → the id assigned to this request
async fn whoami(req: Request) -> String {
    req.request_id()
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    let region = req.get_cloned::<String>("region").unwrap_or_default();
    info!(user = id, "looking up user");

    Response::json(format!(r#"{{"id":"{id}","region":"{region}"}}"#).into_bytes())
}
