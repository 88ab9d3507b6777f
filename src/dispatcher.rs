//! Pattern-based event dispatcher
//!
//! Routes every inbound [`Event`] to the handlers of each registered
//! [`Pattern`] it satisfies. Patterns are kept in first-registration order and
//! handlers in registration order within a pattern, so dispatch order is
//! deterministic.

use crate::error::InvalidPatternError;
use crate::event::{Event, Pattern};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Handler invoked for each matching event
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Route {
    pattern: Pattern,
    handlers: Vec<EventHandler>,
}

/// Maps partial-match patterns to ordered handler lists
#[derive(Default)]
pub struct EventDispatcher {
    routes: RwLock<Vec<Route>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `pattern`
    ///
    /// Returns `Ok(false)` if the same handler is already registered for an
    /// equal pattern.
    pub fn add_callback(
        &self,
        pattern: Pattern,
        handler: EventHandler,
    ) -> Result<bool, InvalidPatternError> {
        pattern.validate()?;

        let mut routes = self.routes.write();
        let route = match routes.iter().position(|r| r.pattern == pattern) {
            Some(index) => &mut routes[index],
            None => {
                debug!("New dispatch pattern {}", pattern);
                routes.push(Route {
                    pattern,
                    handlers: Vec::new(),
                });
                let last = routes.len() - 1;
                &mut routes[last]
            }
        };

        if route.handlers.iter().any(|h| same_handler(h, &handler)) {
            trace!("Handler already registered for {}", route.pattern);
            return Ok(false);
        }
        route.handlers.push(handler);
        Ok(true)
    }

    /// Deregister `handler` from `pattern`, returns whether it was present
    pub fn remove_callback(&self, pattern: &Pattern, handler: &EventHandler) -> bool {
        let mut routes = self.routes.write();
        let Some(index) = routes.iter().position(|r| &r.pattern == pattern) else {
            return false;
        };

        let route = &mut routes[index];
        let before = route.handlers.len();
        route.handlers.retain(|h| !same_handler(h, handler));
        let removed = route.handlers.len() != before;

        if route.handlers.is_empty() {
            routes.remove(index);
        }
        removed
    }

    /// Invoke every handler whose pattern matches `event`
    ///
    /// Returns the number of handlers invoked. Events matching nothing are
    /// dropped silently. Handlers run on a snapshot taken before the first
    /// call, so they may register or remove callbacks themselves.
    pub fn dispatch(&self, event: &Event) -> usize {
        let matched: Vec<EventHandler> = {
            let routes = self.routes.read();
            routes
                .iter()
                .filter(|route| route.pattern.matches(event))
                .flat_map(|route| route.handlers.iter().cloned())
                .collect()
        };

        if matched.is_empty() {
            trace!("Dropped unmatched event {}", event);
            return 0;
        }

        for handler in &matched {
            handler(event);
        }
        matched.len()
    }

    /// Number of distinct registered patterns
    pub fn pattern_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Number of handlers registered for `pattern`
    pub fn handler_count(&self, pattern: &Pattern) -> usize {
        self.routes
            .read()
            .iter()
            .find(|r| &r.pattern == pattern)
            .map(|r| r.handlers.len())
            .unwrap_or(0)
    }
}

fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
