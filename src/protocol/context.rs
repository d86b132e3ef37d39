//! Shared execution context.
//!
//! A [`Context`] is an attribute bag threaded through request processing,
//! interceptors and handler invocation. The same type serves as the
//! connection-level session context (where the per-connection exchange state
//! is attached) and as the per-exchange processing context. It is shared via
//! `Arc` and internally synchronized, so a handler completing on another
//! thread can still read it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Attribute name under which the current request is published.
pub const HTTP_REQUEST: &str = "http.request";

/// Attribute name under which the committed response is published.
pub const HTTP_RESPONSE: &str = "http.response";

/// Attribute name under which the connection handle is published.
pub const HTTP_CONNECTION: &str = "http.connection";

/// A thread-safe attribute bag keyed by well-known names.
///
/// Values are stored type-erased; [`Context::get`] clones the value back out
/// under its concrete type.
#[derive(Default)]
pub struct Context {
    attrs: Mutex<HashMap<&'static str, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an attribute, replacing any previous value under the name.
    pub fn set<T: Any + Send + Sync>(&self, name: &'static str, value: T) {
        self.attrs.lock().unwrap().insert(name, Box::new(value));
    }

    /// Returns a clone of the attribute stored under `name`, if present and
    /// of type `T`.
    pub fn get<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.attrs.lock().unwrap().get(name).and_then(|value| value.downcast_ref::<T>()).cloned()
    }

    /// Removes the attribute stored under `name`. Returns whether an entry
    /// was present.
    pub fn remove(&self, name: &str) -> bool {
        self.attrs.lock().unwrap().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.lock().unwrap().contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.lock().unwrap().is_empty()
    }

    /// Drops every attribute.
    pub fn clear(&self) {
        self.attrs.lock().unwrap().clear();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs = self.attrs.lock().unwrap();
        f.debug_struct("Context").field("attrs", &attrs.keys().collect::<Vec<_>>()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip_is_typed() {
        let context = Context::new();
        context.set("answer", 42_u32);

        assert_eq!(context.get::<u32>("answer"), Some(42));
        assert_eq!(context.get::<String>("answer"), None);
        assert_eq!(context.get::<u32>("question"), None);
    }

    #[test]
    fn set_replaces_previous_value() {
        let context = Context::new();
        context.set("k", String::from("first"));
        context.set("k", String::from("second"));

        assert_eq!(context.get::<String>("k"), Some(String::from("second")));
    }

    #[test]
    fn clear_empties_the_bag() {
        let context = Context::new();
        context.set(HTTP_REQUEST, String::from("GET /"));
        context.set(HTTP_CONNECTION, 7_u8);
        assert!(!context.is_empty());

        context.clear();
        assert!(context.is_empty());
        assert!(!context.contains(HTTP_REQUEST));
    }

    #[test]
    fn remove_reports_presence() {
        let context = Context::new();
        context.set("k", 1_i32);

        assert!(context.remove("k"));
        assert!(!context.remove("k"));
    }
}
