//! Legacy compatibility facade
//!
//! The API surface old plugin binaries were written against: plain detours
//! (method to method), delegate hooks (method to handler entry) and
//! body-rewriting hooks, each configured with `{manual_apply, priority, id,
//! before, after}` and backed by the shared engine machinery. Construction
//! without explicit configuration consults the ambient [`DetourContext`].

mod context;
mod macros;

use std::sync::Arc;

use hookshim_sdk::{Entry, MethodId, Signature};

use crate::detour::{
    global, BodyTransform, DetourEngine, HookError, HookHandle, HookKind, Trampoline,
};

pub use context::{DetourContext, DetourContextGuard};

/// Configuration block accepted by every legacy hook constructor.
#[derive(Debug, Clone, Default)]
pub struct DetourConfig {
    /// Skip the automatic apply at construction
    pub manual_apply: bool,
    /// Higher sorts earlier in the chain; soft key only
    pub priority: i32,
    /// Empty means "derive from the hook's implementation target"
    pub id: String,
    /// Ids this hook must run before
    pub before: Vec<String>,
    /// Ids this hook must run after
    pub after: Vec<String>,
}

impl DetourConfig {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn manual(mut self) -> Self {
        self.manual_apply = true;
        self
    }

    pub fn run_before(mut self, id: impl Into<String>) -> Self {
        self.before.push(id.into());
        self
    }

    pub fn run_after(mut self, id: impl Into<String>) -> Self {
        self.after.push(id.into());
        self
    }
}

fn ambient_config() -> DetourConfig {
    DetourContext::current().unwrap_or_default()
}

/// Generates the shared instance operations for a facade type wrapping a
/// [`HookHandle`], plus the dispose-on-drop the legacy API promised.
macro_rules! facade_ops {
    ($ty:ident) => {
        impl $ty {
            /// Add this hook to its target's chain. No-op if applied.
            pub fn apply(&self) -> Result<(), HookError> {
                self.inner.apply()
            }

            /// Remove this hook from its target's chain. No-op if not
            /// applied.
            pub fn undo(&self) -> Result<(), HookError> {
                self.inner.undo()
            }

            /// Permanently retire this hook; idempotent.
            pub fn free(&self) -> Result<(), HookError> {
                self.inner.free()
            }

            /// Undo then free.
            pub fn dispose(&self) -> Result<(), HookError> {
                self.inner.dispose()
            }

            pub fn is_valid(&self) -> bool {
                self.inner.is_valid()
            }

            pub fn is_applied(&self) -> bool {
                self.inner.is_applied()
            }

            pub fn target(&self) -> &MethodId {
                self.inner.target()
            }

            pub fn id(&self) -> Result<String, HookError> {
                self.inner.id()
            }

            pub fn set_id(&self, id: impl Into<String>) -> Result<(), HookError> {
                self.inner.set_id(id)
            }

            pub fn priority(&self) -> Result<i32, HookError> {
                self.inner.priority()
            }

            pub fn set_priority(&self, priority: i32) -> Result<(), HookError> {
                self.inner.set_priority(priority)
            }

            pub fn before(&self) -> Result<Vec<String>, HookError> {
                self.inner.before()
            }

            pub fn set_before(&self, before: Vec<String>) -> Result<(), HookError> {
                self.inner.set_before(before)
            }

            pub fn after(&self) -> Result<Vec<String>, HookError> {
                self.inner.after()
            }

            pub fn set_after(&self, after: Vec<String>) -> Result<(), HookError> {
                self.inner.set_after(after)
            }

            /// Position in the target's current applied order; `None`
            /// while not applied.
            pub fn position(&self) -> Option<usize> {
                self.inner.position()
            }

            pub fn chain_len(&self) -> usize {
                self.inner.chain_len()
            }

            /// Forwarding stub for "the rest of the chain, or the
            /// original"; stays live across rebuilds.
            pub fn trampoline(&self) -> Result<Trampoline, HookError> {
                self.inner.trampoline()
            }

            pub fn generate_trampoline(
                &self,
                sig: Option<Signature>,
            ) -> Result<Trampoline, HookError> {
                self.inner.generate_trampoline(sig)
            }

            /// The engine-level handle, for new code interoperating with
            /// legacy hooks.
            pub fn handle(&self) -> &HookHandle {
                &self.inner
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                if let Err(e) = self.inner.free() {
                    tracing::warn!(
                        "failed to free {} on drop: {}",
                        stringify!($ty),
                        e
                    );
                }
            }
        }
    };
}

/// Plain detour: redirect `source` to another method.
///
/// The destination method is pinned alongside the target while applied.
pub struct LegacyDetour {
    inner: HookHandle,
}

impl LegacyDetour {
    /// Detour `source` to `dest` on the process-wide engine, configured by
    /// the ambient context.
    pub fn new(source: MethodId, dest: MethodId) -> Result<Self, HookError> {
        Self::with_engine(global(), source, dest, ambient_config())
    }

    pub fn with_config(
        source: MethodId,
        dest: MethodId,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        Self::with_engine(global(), source, dest, config)
    }

    pub fn with_engine(
        engine: &Arc<DetourEngine>,
        source: MethodId,
        dest: MethodId,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        if source.addr() == dest.addr() {
            return Err(HookError::SelfDetour(source.to_string()));
        }
        let dest_entry = engine.resolve_entry(&dest)?;
        let inner = engine.register(source, HookKind::Entry(dest_entry), Some(dest), config)?;
        Ok(Self { inner })
    }
}

facade_ops!(LegacyDetour);

/// Delegate hook: redirect a method to a handler entry, with a trampoline
/// for calling the rest of the chain.
pub struct LegacyHook {
    inner: HookHandle,
}

impl LegacyHook {
    /// Hook `target` with `handler` on the process-wide engine, configured
    /// by the ambient context.
    pub fn new(target: MethodId, handler: Entry) -> Result<Self, HookError> {
        Self::with_engine(global(), target, handler, ambient_config())
    }

    pub fn with_config(
        target: MethodId,
        handler: Entry,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        Self::with_engine(global(), target, handler, config)
    }

    pub fn with_engine(
        engine: &Arc<DetourEngine>,
        target: MethodId,
        handler: Entry,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        if handler.is_null() {
            return Err(HookError::InvalidTarget("null handler entry".into()));
        }
        let inner = engine.register(target, HookKind::Entry(handler), None, config)?;
        Ok(Self { inner })
    }
}

facade_ops!(LegacyHook);

/// Body-rewriting hook: a manipulator that, given the entry of the method
/// as built so far, produces the entry of the rewritten version. Re-run on
/// every chain rebuild.
pub struct LegacyIlHook {
    inner: HookHandle,
}

impl LegacyIlHook {
    /// Rewrite `target` on the process-wide engine, configured by the
    /// ambient context.
    pub fn new(
        target: MethodId,
        manipulator: impl Fn(Entry) -> Entry + Send + Sync + 'static,
    ) -> Result<Self, HookError> {
        Self::with_engine(global(), target, manipulator, ambient_config())
    }

    pub fn with_config(
        target: MethodId,
        manipulator: impl Fn(Entry) -> Entry + Send + Sync + 'static,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        Self::with_engine(global(), target, manipulator, config)
    }

    pub fn with_engine(
        engine: &Arc<DetourEngine>,
        target: MethodId,
        manipulator: impl Fn(Entry) -> Entry + Send + Sync + 'static,
        config: DetourConfig,
    ) -> Result<Self, HookError> {
        let transform: BodyTransform = Arc::new(manipulator);
        let inner = engine.register(target, HookKind::Rewrite(transform), None, config)?;
        Ok(Self { inner })
    }
}

facade_ops!(LegacyIlHook);
