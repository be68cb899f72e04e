//! Shared hook operations
//!
//! `HookHandle` is the one implementation behind every legacy facade type:
//! apply/undo/free, the rebuild-triggering property setters, diagnostics and
//! trampoline generation. Every operation takes the target's chain lock for
//! its full duration.

use std::sync::Arc;

use hookshim_sdk::{MethodId, Signature};

use crate::violations::{self, Violations};

use super::chain::{self, TargetChain};
use super::error::HookError;
use super::policy::HookInfo;
use super::record::{HookKey, HookKind};
use super::trampoline::Trampoline;
use super::DetourEngine;

pub struct HookHandle {
    engine: Arc<DetourEngine>,
    chain: Arc<TargetChain>,
    key: HookKey,
}

impl HookHandle {
    pub(crate) fn new(engine: Arc<DetourEngine>, chain: Arc<TargetChain>, key: HookKey) -> Self {
        Self { engine, chain, key }
    }

    pub fn target(&self) -> &MethodId {
        &self.chain.target
    }

    /// False once freed.
    pub fn is_valid(&self) -> bool {
        self.chain.state.lock().records.contains_key(self.key)
    }

    pub fn is_applied(&self) -> bool {
        self.chain
            .state
            .lock()
            .records
            .get(self.key)
            .map(|rec| rec.applied)
            .unwrap_or(false)
    }

    /// Add this hook to its target's chain. No-op if already applied.
    pub fn apply(&self) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();

        let (id, index, aux, entry) = {
            let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
            if rec.applied {
                return Ok(());
            }
            let entry = match &rec.kind {
                HookKind::Entry(e) => Some(*e),
                HookKind::Rewrite(_) => None,
            };
            (rec.id.clone(), rec.index, rec.aux.clone(), entry)
        };

        let info = HookInfo {
            target: &self.chain.target,
            id: &id,
            index,
        };
        if !self.engine.policy().on_apply(&info) {
            tracing::debug!("apply of '{}' vetoed by policy", id);
            return Ok(());
        }

        // Two live records routing one target through the same entry would
        // fight over which forwarding cell that entry consults; refuse the
        // duplicate instead of corrupting the chain.
        if let Some(entry) = entry {
            let duplicate = state.records.iter().find(|(key, rec)| {
                *key != self.key
                    && rec.applied
                    && match &rec.kind {
                        HookKind::Entry(e) => *e == entry,
                        HookKind::Rewrite(_) => false,
                    }
            });
            if let Some((_, other)) = duplicate {
                violations::report(
                    self.engine.fatal_violations(),
                    Violations::DOUBLE_REGISTER,
                    &format!(
                        "hook '{}' re-registers entry {} already applied to {} by '{}'",
                        id, entry, self.chain.target, other.id
                    ),
                );
                return Ok(());
            }
        }

        state.records[self.key].applied = true;
        match chain::rebuild(
            &self.chain.target,
            &mut state,
            self.engine.patcher(),
            self.engine.fatal_violations(),
        ) {
            Ok(()) => {
                self.engine.acquire_pins(&self.chain.target, aux.as_ref());
                tracing::debug!("applied hook '{}' to {}", id, self.chain.target);
                Ok(())
            }
            Err(e) => {
                state.records[self.key].applied = false;
                Err(e)
            }
        }
    }

    /// Remove this hook from its target's chain. No-op if not applied.
    pub fn undo(&self) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();

        let (id, index, aux) = {
            let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
            if !rec.applied {
                return Ok(());
            }
            (rec.id.clone(), rec.index, rec.aux.clone())
        };

        let info = HookInfo {
            target: &self.chain.target,
            id: &id,
            index,
        };
        if !self.engine.policy().on_undo(&info) {
            tracing::debug!("undo of '{}' vetoed by policy", id);
            return Ok(());
        }

        state.records[self.key].applied = false;
        match chain::rebuild(
            &self.chain.target,
            &mut state,
            self.engine.patcher(),
            self.engine.fatal_violations(),
        ) {
            Ok(()) => {
                self.engine.release_pins(&self.chain.target, aux.as_ref());
                tracing::debug!("undid hook '{}' on {}", id, self.chain.target);
                Ok(())
            }
            Err(e) => {
                state.records[self.key].applied = true;
                Err(e)
            }
        }
    }

    /// Permanently retire this hook. Idempotent; detaches first if needed.
    ///
    /// Unlike `undo`, the detach here is not subject to policy veto: a
    /// freed record must never stay wired into a live chain.
    pub fn free(&self) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();
        let Some(rec) = state.records.get(self.key) else {
            return Ok(());
        };
        let id = rec.id.clone();
        let aux = rec.aux.clone();

        if rec.applied {
            state.records[self.key].applied = false;
            if let Err(e) = chain::rebuild(
                &self.chain.target,
                &mut state,
                self.engine.patcher(),
                self.engine.fatal_violations(),
            ) {
                state.records[self.key].applied = true;
                return Err(e);
            }
            self.engine.release_pins(&self.chain.target, aux.as_ref());
        }

        state.records.remove(self.key);
        drop(state);
        self.engine.prune(&self.chain.target, &self.chain);
        tracing::debug!("freed hook '{}'", id);
        Ok(())
    }

    /// Undo then free.
    pub fn dispose(&self) -> Result<(), HookError> {
        self.undo()?;
        self.free()
    }

    pub fn id(&self) -> Result<String, HookError> {
        let state = self.chain.state.lock();
        let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
        Ok(rec.id.clone())
    }

    /// Set the id; an empty id restores the derived default. Rebuilds the
    /// chain when applied (ordering may reference ids).
    pub fn set_id(&self, id: impl Into<String>) -> Result<(), HookError> {
        let id = id.into();
        let mut state = self.chain.state.lock();
        let rec = state.records.get_mut(self.key).ok_or(HookError::Disposed)?;
        let new_id = if id.is_empty() {
            rec.derived_id.clone()
        } else {
            id
        };
        if rec.id == new_id {
            return Ok(());
        }
        let old = std::mem::replace(&mut rec.id, new_id);
        let applied = rec.applied;
        if applied {
            if let Err(e) = chain::rebuild(
                &self.chain.target,
                &mut state,
                self.engine.patcher(),
                self.engine.fatal_violations(),
            ) {
                state.records[self.key].id = old;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn priority(&self) -> Result<i32, HookError> {
        let state = self.chain.state.lock();
        let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
        Ok(rec.priority)
    }

    pub fn set_priority(&self, priority: i32) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();
        let rec = state.records.get_mut(self.key).ok_or(HookError::Disposed)?;
        if rec.priority == priority {
            return Ok(());
        }
        let old = std::mem::replace(&mut rec.priority, priority);
        let applied = rec.applied;
        if applied {
            if let Err(e) = chain::rebuild(
                &self.chain.target,
                &mut state,
                self.engine.patcher(),
                self.engine.fatal_violations(),
            ) {
                state.records[self.key].priority = old;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn before(&self) -> Result<Vec<String>, HookError> {
        let state = self.chain.state.lock();
        let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
        Ok(rec.before.clone())
    }

    pub fn set_before(&self, before: Vec<String>) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();
        let rec = state.records.get_mut(self.key).ok_or(HookError::Disposed)?;
        if rec.before == before {
            return Ok(());
        }
        let old = std::mem::replace(&mut rec.before, before);
        let applied = rec.applied;
        if applied {
            if let Err(e) = chain::rebuild(
                &self.chain.target,
                &mut state,
                self.engine.patcher(),
                self.engine.fatal_violations(),
            ) {
                state.records[self.key].before = old;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn after(&self) -> Result<Vec<String>, HookError> {
        let state = self.chain.state.lock();
        let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;
        Ok(rec.after.clone())
    }

    pub fn set_after(&self, after: Vec<String>) -> Result<(), HookError> {
        let mut state = self.chain.state.lock();
        let rec = state.records.get_mut(self.key).ok_or(HookError::Disposed)?;
        if rec.after == after {
            return Ok(());
        }
        let old = std::mem::replace(&mut rec.after, after);
        let applied = rec.applied;
        if applied {
            if let Err(e) = chain::rebuild(
                &self.chain.target,
                &mut state,
                self.engine.patcher(),
                self.engine.fatal_violations(),
            ) {
                state.records[self.key].after = old;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Position in the target's current applied order, outermost first.
    /// `None` while not applied (or freed).
    pub fn position(&self) -> Option<usize> {
        self.chain.state.lock().position(self.key)
    }

    /// Number of hooks in the target's current applied order.
    pub fn chain_len(&self) -> usize {
        self.chain.state.lock().applied_len()
    }

    /// Trampoline with the target's natural signature.
    pub fn trampoline(&self) -> Result<Trampoline, HookError> {
        self.generate_trampoline(None)
    }

    /// Trampoline with the given signature, or the target's natural one.
    ///
    /// The stub stays live across later rebuilds by other hooks: it reads
    /// through the record's forwarding cell at call time.
    pub fn generate_trampoline(&self, sig: Option<Signature>) -> Result<Trampoline, HookError> {
        let state = self.chain.state.lock();
        let rec = state.records.get(self.key).ok_or(HookError::Disposed)?;

        let info = HookInfo {
            target: &self.chain.target,
            id: &rec.id,
            index: rec.index,
        };
        if !self.engine.policy().on_trampoline(&info) {
            return Err(HookError::Vetoed);
        }

        let natural = self.chain.target.sig();
        let sig = match sig {
            None => natural.clone(),
            Some(sig) => {
                if !sig.call_compatible(natural) {
                    violations::report(
                        self.engine.fatal_violations(),
                        Violations::SIGNATURE_MISMATCH,
                        &format!(
                            "trampoline for '{}' requests {} but {} expects {}",
                            rec.id, sig, self.chain.target, natural
                        ),
                    );
                }
                sig
            }
        };
        Ok(Trampoline::new(rec.next.clone(), sig))
    }
}
