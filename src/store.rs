//! Request-scoped key/value store.
//!
//! Every [`Request`](crate::Request) carries its own [`Store`]. Nothing is
//! keyed by a global map, so two requests can never see each other's
//! entries. The handle is `Clone`: middleware keeps a copy so it can clear
//! the store after the request itself has moved into the inner handler.

use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

/// Reserved key under which the request identifier is stored.
pub const REQUEST_ID_KEY: &str = "request-id";

// ── Key ──────────────────────────────────────────────────────────────────────

/// A store key: a string, an integer, or a value of a private key type.
///
/// `"user"` and `String::from("user")` are the same key. Typed keys are
/// compared by type first, so a `struct Tenant;` key never collides with the
/// string `"Tenant"` or with another crate's key type.
///
/// ```rust
/// use reqscope::{Key, Store};
///
/// #[derive(Debug, PartialEq, Eq, Hash)]
/// struct Tenant;
///
/// let store = Store::new();
/// store.set(Key::typed(Tenant), String::from("acme"));
/// assert!(store.get("Tenant").is_none());
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    Str(Cow<'static, str>),
    Int(i64),
    Typed(TypedKey),
}

impl Key {
    /// Wraps a value of any comparable type as a key.
    pub fn typed<K>(key: K) -> Self
    where
        K: Any + Eq + Hash + fmt::Debug + Send + Sync,
    {
        Self::Typed(TypedKey(Arc::new(key)))
    }
}

impl From<&'static str> for Key {
    fn from(s: &'static str) -> Self { Self::Str(Cow::Borrowed(s)) }
}

impl From<String> for Key {
    fn from(s: String) -> Self { Self::Str(Cow::Owned(s)) }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self { Self::Int(n.into()) }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Typed(k) => write!(f, "{:?}", k.0),
        }
    }
}

/// A type-erased key built by [`Key::typed`].
#[derive(Clone)]
pub struct TypedKey(Arc<dyn DynKey>);

trait DynKey: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn DynKey) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
}

impl<K> DynKey for K
where
    K: Any + Eq + Hash + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn DynKey) -> bool {
        other.as_any().downcast_ref::<K>().is_some_and(|other| self == other)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<K>().hash(&mut state);
        self.hash(&mut state);
    }
}

impl PartialEq for TypedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl Eq for TypedKey {}

impl Hash for TypedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_dyn(state);
    }
}

impl fmt::Debug for TypedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// ── Value ────────────────────────────────────────────────────────────────────

/// A type-erased stored value.
///
/// Cloning is one atomic increment. Read it back with
/// [`downcast_ref`](Value::downcast_ref) using the exact type that was stored.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { inner: Arc::new(value), type_name: type_name::<T>() }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Name of the stored type, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Key/value entries belonging to one in-flight request.
#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<RwLock<HashMap<Key, Value>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// The value is wrapped in a fresh [`Value`]; use [`insert`](Store::insert)
    /// for a value that is already erased.
    pub fn set<V: Any + Send + Sync>(&self, key: impl Into<Key>, value: V) {
        self.insert(key, Value::new(value));
    }

    pub fn insert(&self, key: impl Into<Key>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    /// The last value set for `key`, or `None` if never set or cleared.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        self.entries.read().get(&key.into()).cloned()
    }

    /// Typed read: `None` if absent or stored with a different type.
    pub fn get_cloned<T: Any + Clone>(&self, key: impl Into<Key>) -> Option<T> {
        self.get(key)?.downcast_ref::<T>().cloned()
    }

    pub fn remove(&self, key: impl Into<Key>) -> Option<Value> {
        self.entries.write().remove(&key.into())
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.entries.read().contains_key(&key.into())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The request identifier, or `""` when unset or not a `String`.
    pub fn request_id(&self) -> String {
        self.get_cloned::<String>(REQUEST_ID_KEY).unwrap_or_default()
    }

    pub fn set_request_id(&self, id: impl Into<String>) {
        self.set(REQUEST_ID_KEY, id.into());
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.read().iter()).finish()
    }
}

/// Clears the store when dropped.
///
/// Held across the inner handler's future so the store is emptied on every
/// exit path: normal return, panic unwinding, or the future being dropped.
pub(crate) struct ClearOnDrop(pub(crate) Store);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.clear();
    }
}
