//! Per-target chain state and rebuilding
//!
//! One `TargetChain` exists per patched method; its mutex is the exclusive
//! lock every mutation and every diagnostic read of that target's hook set
//! must hold. Rebuilding rewires the trampoline cells and the single native
//! patch so the new order is either fully installed or, on patch failure,
//! the previous wiring is restored byte for byte.

use parking_lot::Mutex;
use slotmap::SlotMap;

use hookshim_runtime::MethodPatcher;
use hookshim_sdk::{Entry, MethodId};

use crate::violations::{self, Violations};

use super::error::HookError;
use super::ordering::{self, OrderingNode};
use super::record::{HookKey, HookKind, HookRecord};

/// Ordering and wiring state for one target method.
pub(crate) struct TargetChain {
    pub target: MethodId,
    pub state: Mutex<ChainState>,
}

impl TargetChain {
    pub fn new(target: MethodId) -> Self {
        Self {
            target,
            state: Mutex::new(ChainState::new()),
        }
    }
}

pub(crate) struct ChainState {
    /// Every valid record targeting this method, applied or not
    pub records: SlotMap<HookKey, HookRecord>,
    /// Physically installed chain, if any
    pub installed: Option<InstalledChain>,
    /// Successful rebuilds since creation, surfaced in diagnostics
    pub rebuilds: u64,
}

#[derive(Clone)]
pub(crate) struct InstalledChain {
    /// Resolved order over applied records, outermost first
    pub order: Vec<HookKey>,
    /// Entry the native patch points the target at
    pub outer: Entry,
}

impl ChainState {
    pub fn new() -> Self {
        Self {
            records: SlotMap::with_key(),
            installed: None,
            rebuilds: 0,
        }
    }

    /// Position of `key` in the installed order, if applied.
    pub fn position(&self, key: HookKey) -> Option<usize> {
        self.installed
            .as_ref()
            .and_then(|chain| chain.order.iter().position(|&k| k == key))
    }

    pub fn applied_len(&self) -> usize {
        self.installed.as_ref().map(|c| c.order.len()).unwrap_or(0)
    }
}

/// Recompute and reinstall the chain for `target` from its applied records.
///
/// Caller holds the chain lock. All-or-nothing: when the native primitive
/// fails, every trampoline cell is restored to its prior value, the
/// installed state is left untouched and the error propagates.
pub(crate) fn rebuild(
    target: &MethodId,
    state: &mut ChainState,
    patcher: &dyn MethodPatcher,
    fatal: Violations,
) -> Result<(), HookError> {
    let original = patcher.original(target)?;

    let nodes: Vec<OrderingNode<'_>> = state
        .records
        .iter()
        .filter(|(_, rec)| rec.applied)
        .map(|(key, rec)| OrderingNode {
            key,
            index: rec.index,
            priority: rec.priority,
            id: &rec.id,
            before: &rec.before,
            after: &rec.after,
        })
        .collect();
    let resolution = ordering::resolve(&nodes);
    for (from, to) in &resolution.dropped {
        violations::report(
            fatal,
            Violations::CONSTRAINT_CYCLE,
            &format!(
                "hooks on {} form an ordering cycle; ignoring constraint '{}' -> '{}'",
                target, from, to
            ),
        );
    }
    let order = resolution.order;

    // Snapshot every forwarding cell so a failed install can be undone.
    let saved: Vec<(HookKey, Entry)> = state
        .records
        .iter()
        .map(|(key, rec)| (key, rec.next.get()))
        .collect();

    // Fold body rewriters innermost-first over the original body; each
    // rewriter's trampoline keeps the body it was handed.
    let mut body = original;
    for &key in order.iter().rev() {
        let rec = &state.records[key];
        if let HookKind::Rewrite(transform) = &rec.kind {
            rec.next.set(body);
            body = transform(body);
        }
    }

    // Wire entry hooks innermost-first; the innermost forwards to the body.
    let mut outer = body;
    for &key in order.iter().rev() {
        let rec = &state.records[key];
        if let HookKind::Entry(entry) = rec.kind {
            rec.next.set(outer);
            outer = entry;
        }
    }

    // Detached records keep a working stub: they forward to the unpatched
    // body until (re)applied.
    for (_, rec) in state.records.iter().filter(|(_, rec)| !rec.applied) {
        rec.next.set(original);
    }

    let result = if order.is_empty() {
        if state.installed.is_some() {
            patcher.remove(target)
        } else {
            Ok(())
        }
    } else {
        patcher.install(target, outer)
    };

    match result {
        Ok(()) => {
            tracing::debug!("rebuilt chain for {} ({} applied)", target, order.len());
            state.installed = if order.is_empty() {
                None
            } else {
                Some(InstalledChain { order, outer })
            };
            state.rebuilds += 1;
            Ok(())
        }
        Err(e) => {
            for (key, entry) in saved {
                if let Some(rec) = state.records.get(key) {
                    rec.next.set(entry);
                }
            }
            tracing::error!(
                "chain rebuild for {} failed, previous wiring kept: {}",
                target,
                e
            );
            Err(HookError::PatchInstall(e))
        }
    }
}
