//! The method pinning seam
//!
//! Some host runtimes may move, collect or recompile method bodies while
//! the process runs. A pin tells the host a method's code and address must
//! stay stable; the engine refcounts pins so the host primitive is touched
//! only on the outermost acquire and release.

use hookshim_sdk::MethodId;

/// Token holding one external pin; releases it when dropped.
pub struct PinHandle(Option<Box<dyn FnOnce() + Send + Sync>>);

impl PinHandle {
    /// Wrap a host-supplied release action.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// A pin with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }
}

impl Drop for PinHandle {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl std::fmt::Debug for PinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PinHandle")
            .field(&self.0.as_ref().map(|_| "release"))
            .finish()
    }
}

/// Keeps a method's code from being moved, collected or recompiled.
pub trait MethodPinner: Send + Sync {
    fn pin(&self, method: &MethodId) -> PinHandle;
}

/// Pinner for hosts without relocation hazards.
pub struct NoopPinner;

impl MethodPinner for NoopPinner {
    fn pin(&self, method: &MethodId) -> PinHandle {
        tracing::trace!("pin requested for {} (no-op host)", method);
        PinHandle::noop()
    }
}
