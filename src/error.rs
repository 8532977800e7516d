//! Unified error type.

/// The error type returned by reqscope's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and construction-time misconfiguration. Nothing
/// on the per-request path returns it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// `Server::bind` was given something that is not `host:port`.
    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A middleware was constructed from a malformed argument list.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configured header name is not a valid HTTP header name.
    #[error("invalid header name `{0}`")]
    InvalidHeader(String),
}
