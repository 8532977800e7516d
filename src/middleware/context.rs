//! Context middleware: seeds every request's store with fixed entries.
//!
//! The entries are resolved once, when the middleware is built, and copied
//! into the store of each request before the inner handler runs. When the
//! chain below returns, the store is cleared, whether the handler
//! succeeded, returned an error response, panicked or was cancelled.
//!
//! ```rust
//! use std::collections::HashMap;
//! use reqscope::{args, store::Value, middleware::Context};
//!
//! // builder
//! let built = Context::new().with("tenant", "acme").with("tier", 2_i64);
//!
//! // flat argument list: maps merge, everything else pairs up
//! let mut defaults = HashMap::new();
//! defaults.insert("tier".to_owned(), Value::new(2_i64));
//! let parsed = Context::from_args(args!["tenant", "acme", defaults]).unwrap();
//!
//! // both forms store string literals as `String`
//! for ctx in [&built, &parsed] {
//!     let tenant = ctx.get("tenant").unwrap().downcast_ref::<String>();
//!     assert_eq!(tenant.map(String::as_str), Some("acme"));
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;

use tracing::trace;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::store::{ClearOnDrop, Key, Value};

/// One element of a flat argument list for [`Context::from_args`].
///
/// `&'static str`, `String`, `i32`, `i64`, `u32` and [`Key`] become
/// [`Arg::Key`]; `HashMap<String, Value>` becomes [`Arg::Map`]. Anything
/// else goes in via [`Arg::value`].
#[derive(Clone, Debug)]
pub enum Arg {
    /// Entries merged wholesale.
    Map(HashMap<String, Value>),
    /// An atom usable on either side of a pair: the [`Key`] is used in key
    /// position, the [`Value`] in value position. Integers keep their type
    /// as values; string literals are stored as `String`.
    Key(Key, Value),
    /// An opaque value. Only valid in value position.
    Value(Value),
}

impl Arg {
    pub fn value<V: Any + Send + Sync>(value: V) -> Self {
        Self::Value(Value::new(value))
    }
}

impl From<HashMap<String, Value>> for Arg {
    fn from(map: HashMap<String, Value>) -> Self { Self::Map(map) }
}

impl From<Key> for Arg {
    fn from(key: Key) -> Self { Self::Key(key.clone(), Value::new(key)) }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self { Self::Value(value) }
}

impl From<&'static str> for Arg {
    fn from(s: &'static str) -> Self { Self::Key(s.into(), Value::new(s.to_owned())) }
}

impl From<String> for Arg {
    fn from(s: String) -> Self { Self::Key(s.clone().into(), Value::new(s)) }
}

impl From<i32> for Arg {
    fn from(n: i32) -> Self { Self::Key(n.into(), Value::new(n)) }
}

impl From<i64> for Arg {
    fn from(n: i64) -> Self { Self::Key(n.into(), Value::new(n)) }
}

impl From<u32> for Arg {
    fn from(n: u32) -> Self { Self::Key(n.into(), Value::new(n)) }
}

/// Builds a `Vec<Arg>` from a list of expressions.
///
/// ```rust
/// use reqscope::{args, middleware::Arg};
/// let list: Vec<Arg> = args!["user", "alice", "retries", 3_i64];
/// assert_eq!(list.len(), 4);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::middleware::Arg::from($arg)),*]
    };
}

/// Middleware that copies fixed entries into each request's store.
#[derive(Clone, Debug, Default)]
pub struct Context {
    entries: HashMap<Key, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one entry, replacing an earlier one with the same key.
    ///
    /// A `&'static str` value is stored as `String`, the same as
    /// [`from_args`](Context::from_args) does.
    pub fn with<V: Any + Send + Sync>(mut self, key: impl Into<Key>, value: V) -> Self {
        self.entries.insert(key.into(), owned_str(Value::new(value)));
        self
    }

    /// Adds every entry of `map`.
    pub fn merge<I>(mut self, map: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.entries.extend(map.into_iter().map(|(k, v)| (Key::from(k), v)));
        self
    }

    /// Builds the entries from a flat argument list, left to right.
    ///
    /// A map is merged and consumes one slot. Anything else must be a key
    /// followed by its value and consumes two. Later entries win.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a trailing key without a value, an
    /// opaque value in key position, or a map in value position.
    pub fn from_args<I>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Arg>,
    {
        let mut entries = HashMap::new();
        let mut args = args.into_iter().enumerate();

        while let Some((pos, arg)) = args.next() {
            let key = match arg {
                Arg::Map(map) => {
                    entries.extend(map.into_iter().map(|(k, v)| (Key::from(k), v)));
                    continue;
                }
                Arg::Key(key, _) => key,
                Arg::Value(value) => {
                    return Err(Error::InvalidArgument(format!(
                        "argument {pos}: expected a key or a map, found a value of type {}",
                        value.type_name()
                    )));
                }
            };

            let value = match args.next() {
                Some((_, Arg::Key(_, v))) => v,
                Some((_, Arg::Value(v))) => v,
                Some((next, Arg::Map(_))) => {
                    return Err(Error::InvalidArgument(format!(
                        "argument {next}: expected a value for key `{key}`, found a map"
                    )));
                }
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "argument {pos}: key `{key}` has no value"
                    )));
                }
            };
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn owned_str(value: Value) -> Value {
    if let Some(s) = value.downcast_ref::<&'static str>() {
        return Value::new((*s).to_owned());
    }
    value
}

impl Middleware for Context {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let entries = self.entries.clone();
        Box::pin(async move {
            let _guard = ClearOnDrop(req.store().clone());
            for (key, value) in entries {
                req.store().insert(key, value);
            }
            trace!(entries = req.store().len(), "request context populated");

            next.run(req).await
        })
    }
}
