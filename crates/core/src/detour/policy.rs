//! Interception policy
//!
//! The legacy API exposed process-wide callback slots invoked around hook
//! operations, used for instrumentation and for the compatibility layer to
//! override behavior without touching call sites. Here the same capability
//! is an object injected per engine, so the core stays testable in
//! isolation.

use hookshim_sdk::MethodId;

/// Information handed to interception callbacks.
pub struct HookInfo<'a> {
    pub target: &'a MethodId,
    pub id: &'a str,
    pub index: u64,
}

/// Veto points around engine operations.
///
/// Callbacks run while the target's chain lock is held: do not construct,
/// apply or otherwise mutate hooks on the same target from inside one.
pub trait InterceptionPolicy: Send + Sync {
    /// Return false to skip applying the hook (logged no-op).
    fn on_apply(&self, info: &HookInfo<'_>) -> bool {
        let _ = info;
        true
    }

    /// Return false to skip undoing the hook (logged no-op).
    fn on_undo(&self, info: &HookInfo<'_>) -> bool {
        let _ = info;
        true
    }

    /// Return false to refuse trampoline generation.
    fn on_trampoline(&self, info: &HookInfo<'_>) -> bool {
        let _ = info;
        true
    }
}

/// Policy that allows everything.
pub struct DefaultPolicy;

impl InterceptionPolicy for DefaultPolicy {}
