//! Pattern-based handler registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::handler::{HandlerResolver, RequestHandler};

/// Maps URI patterns to request handlers.
///
/// Supported patterns: `*` (match-all), exact paths, `prefix*` and
/// `*.suffix`. Lookup strips the query and fragment from the request URI,
/// prefers an exact match, and otherwise picks the matching pattern with the
/// longest literal part.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pattern: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.handlers.write().unwrap().insert(pattern.into(), handler);
    }

    /// Removes a pattern. Returns whether it was registered.
    pub fn unregister(&self, pattern: &str) -> bool {
        self.handlers.write().unwrap().remove(pattern).is_some()
    }

    fn matches(pattern: &str, path: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            if path.starts_with(prefix) {
                return true;
            }
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            if path.ends_with(suffix) {
                return true;
            }
        }
        false
    }
}

impl HandlerResolver for HandlerRegistry {
    fn lookup(&self, uri: &str) -> Option<Arc<dyn RequestHandler>> {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let handlers = self.handlers.read().unwrap();

        if let Some(handler) = handlers.get(path) {
            return Some(Arc::clone(handler));
        }

        let mut best: Option<&str> = None;
        for pattern in handlers.keys() {
            if Self::matches(pattern, path) && best.map_or(true, |b| b.len() < pattern.len()) {
                best = Some(pattern);
            }
        }
        best.and_then(|pattern| handlers.get(pattern)).map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::handler::RequestConsumer;
    use crate::protocol::{Context, HttpError, Request};
    use crate::service::ResponseTrigger;

    struct StubHandler;

    impl RequestHandler for StubHandler {
        fn process_request(&self, _: &Request, _: &Context) -> Result<Box<dyn RequestConsumer>, HttpError> {
            unimplemented!("registry tests never consume requests")
        }

        fn handle(&self, _: Option<Box<dyn Any + Send>>, _: ResponseTrigger, _: &Arc<Context>) -> Result<(), HttpError> {
            unimplemented!("registry tests never handle requests")
        }
    }

    struct Registered {
        registry: HandlerRegistry,
        all: Arc<dyn RequestHandler>,
        stat: Arc<dyn RequestHandler>,
        css: Arc<dyn RequestHandler>,
        gif: Arc<dyn RequestHandler>,
        index: Arc<dyn RequestHandler>,
    }

    fn registry() -> Registered {
        let all: Arc<dyn RequestHandler> = Arc::new(StubHandler);
        let stat: Arc<dyn RequestHandler> = Arc::new(StubHandler);
        let css: Arc<dyn RequestHandler> = Arc::new(StubHandler);
        let gif: Arc<dyn RequestHandler> = Arc::new(StubHandler);
        let index: Arc<dyn RequestHandler> = Arc::new(StubHandler);

        let registry = HandlerRegistry::new();
        registry.register("*", Arc::clone(&all));
        registry.register("/static/*", Arc::clone(&stat));
        registry.register("/static/css/*", Arc::clone(&css));
        registry.register("*.gif", Arc::clone(&gif));
        registry.register("/index.html", Arc::clone(&index));
        Registered { registry, all, stat, css, gif, index }
    }

    fn resolves_to(reg: &Registered, uri: &str, expected: &Arc<dyn RequestHandler>) -> bool {
        reg.registry.lookup(uri).map_or(false, |found| Arc::ptr_eq(&found, expected))
    }

    #[test]
    fn exact_match_wins() {
        let reg = registry();
        assert!(resolves_to(&reg, "/index.html", &reg.index));
    }

    #[test]
    fn longest_literal_prefix_wins() {
        let reg = registry();
        assert!(resolves_to(&reg, "/static/css/site.css", &reg.css));
        assert!(resolves_to(&reg, "/static/app.js", &reg.stat));
    }

    #[test]
    fn suffix_pattern_matches() {
        let reg = registry();
        assert!(resolves_to(&reg, "/images/logo.gif", &reg.gif));
    }

    #[test]
    fn wildcard_is_the_fallback() {
        let reg = registry();
        assert!(resolves_to(&reg, "/anything/else", &reg.all));
    }

    #[test]
    fn query_and_fragment_are_stripped() {
        let reg = registry();
        assert!(resolves_to(&reg, "/index.html?version=2#top", &reg.index));
    }

    #[test]
    fn unregister_removes_the_pattern() {
        let reg = registry();
        assert!(reg.registry.unregister("/index.html"));
        assert!(!reg.registry.unregister("/index.html"));
        assert!(resolves_to(&reg, "/index.html", &reg.all));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup("/index.html").is_none());
    }
}
