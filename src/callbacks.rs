//! Observer list shared by all stateful controls
//!
//! Handlers are held as strong `Arc`s and identified by pointer, so adding
//! the same `Arc` twice is a no-op and removal needs the registered handle.

use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe, ordered list of callback handles
pub struct CallbackRegistry<H: ?Sized> {
    handlers: Mutex<Vec<Arc<H>>>,
}

impl<H: ?Sized> CallbackRegistry<H> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler
    ///
    /// Returns `false` if this exact handler is already registered.
    pub fn add(&self, handler: Arc<H>) -> bool {
        let mut handlers = self.handlers.lock();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Deregister a handler, returns whether it was present
    pub fn remove(&self, handler: &Arc<H>) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        handlers.len() != before
    }

    pub fn clear(&self) {
        self.handlers.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    /// Copy of the current handler list, in registration order
    pub fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers.lock().clone()
    }

    /// Invoke `call` for every handler in registration order
    ///
    /// Runs on a snapshot: handlers may add or remove callbacks on this
    /// registry without deadlocking, and the change applies from the next
    /// notification on.
    pub fn notify(&self, mut call: impl FnMut(&H)) {
        for handler in self.snapshot() {
            call(&handler);
        }
    }
}

impl<H: ?Sized> Default for CallbackRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare data pointers only; vtable pointers of the same closure may differ
/// across codegen units.
fn same_handler<H: ?Sized>(a: &Arc<H>, b: &Arc<H>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
