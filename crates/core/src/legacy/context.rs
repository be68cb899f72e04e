//! Ambient configuration context
//!
//! Legacy plugins wrap a batch of hook constructions in a context that
//! supplies default configuration. The context is a thread-local stack;
//! whatever is innermost when a hook is constructed without explicit
//! configuration wins, resolved at construction time, never at apply time.

use std::cell::RefCell;
use std::marker::PhantomData;

use super::DetourConfig;

thread_local! {
    static AMBIENT: RefCell<Vec<DetourConfig>> = const { RefCell::new(Vec::new()) };
}

/// Scoped source of default configuration for the current thread.
pub struct DetourContext;

impl DetourContext {
    /// Push `config` as the ambient default until the guard drops.
    pub fn push(config: DetourConfig) -> DetourContextGuard {
        AMBIENT.with(|stack| stack.borrow_mut().push(config));
        DetourContextGuard {
            _not_send: PhantomData,
        }
    }

    /// The innermost ambient config, if any.
    pub fn current() -> Option<DetourConfig> {
        AMBIENT.with(|stack| stack.borrow().last().cloned())
    }
}

/// Pops its context frame on drop. Not `Send`: the frame belongs to the
/// thread that pushed it.
pub struct DetourContextGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for DetourContextGuard {
    fn drop(&mut self) {
        AMBIENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
