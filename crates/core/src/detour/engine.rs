//! The detour engine
//!
//! Ties the registry, pin tracker and injected host seams together and
//! hands out [`HookHandle`]s. A process-wide default engine backs the
//! legacy facade; tests and alternative hosts construct their own.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use hookshim_runtime::{MethodPatcher, MethodPinner, NoopPinner, SlotPatcher};
use hookshim_sdk::{Entry, MethodId};

use crate::diagnostics::{ChainSnapshot, HookSnapshot};
use crate::legacy::DetourConfig;
use crate::violations::Violations;

use super::chain::TargetChain;
use super::error::HookError;
use super::handle::HookHandle;
use super::pinning::PinTracker;
use super::policy::{DefaultPolicy, InterceptionPolicy};
use super::record::{HookKind, HookRecord};
use super::registry::TargetRegistry;

pub struct DetourEngine {
    registry: TargetRegistry,
    pins: PinTracker,
    patcher: Arc<dyn MethodPatcher>,
    pinner: Arc<dyn MethodPinner>,
    policy: RwLock<Arc<dyn InterceptionPolicy>>,
    /// Violation classes escalated to panics (developer/strict mode)
    fatal: AtomicU32,
}

impl DetourEngine {
    pub fn new(patcher: Arc<dyn MethodPatcher>, pinner: Arc<dyn MethodPinner>) -> Self {
        Self {
            registry: TargetRegistry::new(),
            pins: PinTracker::new(),
            patcher,
            pinner,
            policy: RwLock::new(Arc::new(DefaultPolicy)),
            fatal: AtomicU32::new(Violations::empty().bits()),
        }
    }

    /// Replace the interception policy for all subsequent operations.
    pub fn set_policy(&self, policy: Arc<dyn InterceptionPolicy>) {
        *self.policy.write() = policy;
    }

    pub fn set_fatal_violations(&self, mask: Violations) {
        self.fatal.store(mask.bits(), Ordering::SeqCst);
    }

    pub fn fatal_violations(&self) -> Violations {
        Violations::from_bits_truncate(self.fatal.load(Ordering::SeqCst))
    }

    /// Outstanding pin references for a method (diagnostic).
    pub fn pin_count(&self, method: &MethodId) -> u32 {
        self.pins.count(method)
    }

    /// Diagnostic view of one target's hook set, or `None` when nothing
    /// has ever hooked it (or its state was pruned).
    pub fn snapshot(&self, target: &MethodId) -> Option<ChainSnapshot> {
        let chain = self.registry.get(target)?;
        let state = chain.state.lock();
        let mut hooks: Vec<HookSnapshot> = state
            .records
            .iter()
            .map(|(key, rec)| HookSnapshot {
                id: rec.id.clone(),
                index: rec.index,
                priority: rec.priority,
                before: rec.before.clone(),
                after: rec.after.clone(),
                kind: rec.kind.name(),
                applied: rec.applied,
                position: state.position(key),
            })
            .collect();
        hooks.sort_by_key(|h| h.index);
        Some(ChainSnapshot {
            target: chain.target.to_string(),
            rebuilds: state.rebuilds,
            installed_entry: state.installed.as_ref().map(|c| c.outer.to_string()),
            hooks,
        })
    }

    pub fn snapshot_json(&self, target: &MethodId) -> Option<String> {
        self.snapshot(target).and_then(|s| s.to_json().ok())
    }

    pub(crate) fn patcher(&self) -> &dyn MethodPatcher {
        &*self.patcher
    }

    pub(crate) fn policy(&self) -> Arc<dyn InterceptionPolicy> {
        self.policy.read().clone()
    }

    /// Current dispatch entry of a method, for use as replacement behavior.
    pub(crate) fn resolve_entry(&self, method: &MethodId) -> Result<Entry, HookError> {
        self.patcher
            .entry(method)
            .map_err(|e| HookError::InvalidTarget(e.to_string()))
    }

    pub(crate) fn acquire_pins(&self, target: &MethodId, aux: Option<&MethodId>) {
        self.pins.acquire(target, &*self.pinner);
        if let Some(method) = aux {
            self.pins.acquire(method, &*self.pinner);
        }
    }

    pub(crate) fn release_pins(&self, target: &MethodId, aux: Option<&MethodId>) {
        self.pins.release(target);
        if let Some(method) = aux {
            self.pins.release(method);
        }
    }

    pub(crate) fn prune(&self, target: &MethodId, chain: &Arc<TargetChain>) {
        self.registry.prune(target, chain);
    }

    /// Create and register a hook record for `target`.
    ///
    /// The target is resolved up front so the record's trampoline starts
    /// out forwarding to the real body; unless `manual_apply` is set the
    /// hook is applied before this returns.
    pub(crate) fn register(
        self: &Arc<Self>,
        target: MethodId,
        kind: HookKind,
        aux: Option<MethodId>,
        config: DetourConfig,
    ) -> Result<HookHandle, HookError> {
        if target.is_null() {
            return Err(HookError::InvalidTarget("null method identity".into()));
        }
        let original = self
            .patcher
            .original(&target)
            .map_err(|e| HookError::InvalidTarget(e.to_string()))?;

        let chain = self.registry.get_or_create(&target);
        let record = HookRecord::new(
            kind,
            aux,
            config.id,
            config.priority,
            config.before,
            config.after,
            original,
        );
        let id = record.id.clone();
        let key = chain.state.lock().records.insert(record);
        let handle = HookHandle::new(self.clone(), chain, key);
        tracing::debug!("registered hook '{}' for {}", id, target);

        if !config.manual_apply {
            if let Err(e) = handle.apply() {
                let _ = handle.free();
                return Err(e);
            }
        }
        Ok(handle)
    }
}

/// Process-wide default engine: slot-dispatch patching, no pin hazards.
static GLOBAL: LazyLock<Arc<DetourEngine>> = LazyLock::new(|| {
    Arc::new(DetourEngine::new(
        Arc::new(SlotPatcher::new()),
        Arc::new(NoopPinner),
    ))
});

/// The engine legacy call sites register against.
pub fn global() -> &'static Arc<DetourEngine> {
    &GLOBAL
}
