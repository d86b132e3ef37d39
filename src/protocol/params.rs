//! Layered protocol parameters.
//!
//! Every message carries a [`Params`] bag; the service carries one holding
//! server-wide defaults. Before a message is processed, the service installs
//! its own bag as the defaults layer of the message bag: local entries win,
//! absent keys fall through. The overlay is not a replacement: writing
//! through the message bag never touches the defaults.

use std::collections::HashMap;
use std::sync::Arc;

/// Parameter key naming the origin server, consumed by the `Server` response
/// interceptor.
pub const ORIGIN_SERVER: &str = "http.origin-server";

/// Parameter key for the protocol version the server speaks natively.
pub const PROTOCOL_VERSION: &str = "http.protocol.version";

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A key/value parameter bag with an optional shared defaults layer.
#[derive(Debug, Clone, Default)]
pub struct Params {
    local: HashMap<String, ParamValue>,
    defaults: Option<Arc<Params>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a local entry, shadowing any default under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.local.insert(name.into(), value.into());
        self
    }

    /// Looks up a parameter, falling through to the defaults layer when the
    /// name has no local entry.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        match self.local.get(name) {
            Some(value) => Some(value),
            None => self.defaults.as_ref().and_then(|defaults| defaults.get(name)),
        }
    }

    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn int_param(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    pub fn bool_param(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    /// Installs the fallback layer. Local entries keep winning; the layer is
    /// shared, never written through.
    pub fn set_defaults(&mut self, defaults: Arc<Params>) {
        self.defaults = Some(defaults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_entry_shadows_default() {
        let mut defaults = Params::new();
        defaults.set(ORIGIN_SERVER, "nio-http/0.1");
        let defaults = Arc::new(defaults);

        let mut params = Params::new();
        params.set(ORIGIN_SERVER, "custom/1.0");
        params.set_defaults(Arc::clone(&defaults));

        assert_eq!(params.str_param(ORIGIN_SERVER), Some("custom/1.0"));
    }

    #[test]
    fn absent_key_falls_through() {
        let mut defaults = Params::new();
        defaults.set("http.socket.timeout", 5_000_i64);
        defaults.set("http.tcp.nodelay", true);

        let mut params = Params::new();
        params.set_defaults(Arc::new(defaults));

        assert_eq!(params.int_param("http.socket.timeout"), Some(5_000));
        assert_eq!(params.bool_param("http.tcp.nodelay"), Some(true));
        assert_eq!(params.get("no.such.param"), None);
    }

    #[test]
    fn overlay_never_writes_the_defaults() {
        let defaults = Arc::new({
            let mut p = Params::new();
            p.set(ORIGIN_SERVER, "nio-http/0.1");
            p
        });

        let mut params = Params::new();
        params.set_defaults(Arc::clone(&defaults));
        params.set(ORIGIN_SERVER, "other/2.0");

        assert_eq!(defaults.str_param(ORIGIN_SERVER), Some("nio-http/0.1"));
        assert_eq!(params.str_param(ORIGIN_SERVER), Some("other/2.0"));
    }

    #[test]
    fn typed_accessors_reject_mismatched_values() {
        let mut params = Params::new();
        params.set("flag", true);

        assert_eq!(params.str_param("flag"), None);
        assert_eq!(params.bool_param("flag"), Some(true));
    }
}
